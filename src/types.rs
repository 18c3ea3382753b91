use serde::{Deserialize, Serialize};

use crate::error::KennzeichenError;

/// Sentinel `derived_from` value for codes without a geographic origin.
pub const ARBITRARY_ORIGIN: &str = "willkürlich gewählt";

/// A single license plate district code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateRecord {
    pub code: String,
    pub city_district: String,
    pub derived_from: String,
    pub federal_state: String,
}

impl PlateRecord {
    pub fn new(
        code: impl Into<String>,
        city_district: impl Into<String>,
        derived_from: impl Into<String>,
        federal_state: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            city_district: city_district.into(),
            derived_from: derived_from.into(),
            federal_state: federal_state.into(),
        }
    }

    /// True when the code has no geographic derivation.
    pub fn is_arbitrary(&self) -> bool {
        self.derived_from == ARBITRARY_ORIGIN
    }

    /// The known federal state this record belongs to, if the name is recognised.
    pub fn state(&self) -> Option<FederalState> {
        FederalState::from_name(&self.federal_state)
    }
}

/// Metadata block shipped with the dataset resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub note: String,
}

/// On-disk shape of the dataset resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlateDataset {
    pub license_plates: Vec<PlateRecord>,
    #[serde(default)]
    pub metadata: DatasetMetadata,
}

/// The sixteen German federal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FederalState {
    BadenWuerttemberg,
    Bayern,
    Berlin,
    Brandenburg,
    Bremen,
    Hamburg,
    Hessen,
    MecklenburgVorpommern,
    Niedersachsen,
    NordrheinWestfalen,
    RheinlandPfalz,
    Saarland,
    Sachsen,
    SachsenAnhalt,
    SchleswigHolstein,
    Thueringen,
}

impl FederalState {
    pub const ALL: [FederalState; 16] = [
        FederalState::BadenWuerttemberg,
        FederalState::Bayern,
        FederalState::Berlin,
        FederalState::Brandenburg,
        FederalState::Bremen,
        FederalState::Hamburg,
        FederalState::Hessen,
        FederalState::MecklenburgVorpommern,
        FederalState::Niedersachsen,
        FederalState::NordrheinWestfalen,
        FederalState::RheinlandPfalz,
        FederalState::Saarland,
        FederalState::Sachsen,
        FederalState::SachsenAnhalt,
        FederalState::SchleswigHolstein,
        FederalState::Thueringen,
    ];

    /// Name as it appears in the dataset.
    pub fn name(self) -> &'static str {
        match self {
            FederalState::BadenWuerttemberg => "Baden-Württemberg",
            FederalState::Bayern => "Bayern",
            FederalState::Berlin => "Berlin",
            FederalState::Brandenburg => "Brandenburg",
            FederalState::Bremen => "Bremen",
            FederalState::Hamburg => "Hamburg",
            FederalState::Hessen => "Hessen",
            FederalState::MecklenburgVorpommern => "Mecklenburg-Vorpommern",
            FederalState::Niedersachsen => "Niedersachsen",
            FederalState::NordrheinWestfalen => "Nordrhein-Westfalen",
            FederalState::RheinlandPfalz => "Rheinland-Pfalz",
            FederalState::Saarland => "Saarland",
            FederalState::Sachsen => "Sachsen",
            FederalState::SachsenAnhalt => "Sachsen-Anhalt",
            FederalState::SchleswigHolstein => "Schleswig-Holstein",
            FederalState::Thueringen => "Thüringen",
        }
    }

    /// ISO 3166-2 style two-letter abbreviation.
    pub fn abbreviation(self) -> &'static str {
        match self {
            FederalState::BadenWuerttemberg => "BW",
            FederalState::Bayern => "BY",
            FederalState::Berlin => "BE",
            FederalState::Brandenburg => "BB",
            FederalState::Bremen => "HB",
            FederalState::Hamburg => "HH",
            FederalState::Hessen => "HE",
            FederalState::MecklenburgVorpommern => "MV",
            FederalState::Niedersachsen => "NI",
            FederalState::NordrheinWestfalen => "NW",
            FederalState::RheinlandPfalz => "RP",
            FederalState::Saarland => "SL",
            FederalState::Sachsen => "SN",
            FederalState::SachsenAnhalt => "ST",
            FederalState::SchleswigHolstein => "SH",
            FederalState::Thueringen => "TH",
        }
    }

    /// Stable position in [`FederalState::ALL`].
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }

    /// Look up a state by its dataset name (exact match).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Look up a state by dataset name or abbreviation, ignoring case.
    pub fn resolve(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL.into_iter().find(|s| {
            unicase::eq(s.name(), input) || unicase::eq(s.abbreviation(), input)
        })
    }
}

impl std::fmt::Display for FederalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the result list is bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Alphabetical,
    Grouped,
}

enum_display_fromstr!(
    ViewMode,
    KennzeichenError::InvalidViewMode,
    {
        Alphabetical => "alphabetical",
        Grouped => "grouped",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_states_round_trip_by_name() {
        for state in FederalState::ALL {
            assert_eq!(FederalState::from_name(state.name()), Some(state));
        }
        assert_eq!(FederalState::ALL.len(), 16);
    }

    #[test]
    fn test_resolve_accepts_abbreviation_and_case() {
        assert_eq!(FederalState::resolve("hh"), Some(FederalState::Hamburg));
        assert_eq!(
            FederalState::resolve("thüringen"),
            Some(FederalState::Thueringen)
        );
        assert_eq!(FederalState::resolve("Atlantis"), None);
    }

    #[test]
    fn test_index_is_stable() {
        assert_eq!(FederalState::BadenWuerttemberg.index(), 0);
        assert_eq!(FederalState::Thueringen.index(), 15);
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("grouped".parse::<ViewMode>().unwrap(), ViewMode::Grouped);
        assert_eq!(ViewMode::Alphabetical.to_string(), "alphabetical");
        assert!("list".parse::<ViewMode>().is_err());
    }

    #[test]
    fn test_dataset_deserializes_with_metadata() {
        let json = r#"{
            "license_plates": [
                {"code": "B", "city_district": "Berlin", "derived_from": "Berlin", "federal_state": "Berlin"}
            ],
            "metadata": {"source": "KBA", "description": "d", "last_updated": "2025-01-01", "note": "n"}
        }"#;
        let dataset: PlateDataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.license_plates.len(), 1);
        assert_eq!(dataset.metadata.source, "KBA");
        assert_eq!(dataset.license_plates[0].state(), Some(FederalState::Berlin));
    }
}
