//! Read-only lookup into the pre-geocoded city cache.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KennzeichenError, Result};
use crate::types::PlateRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedCity {
    pub name: String,
    pub state: String,
    pub lat: f64,
    pub lng: f64,
}

/// Cities keyed by `(name, state)`; the same town name exists in several states.
#[derive(Debug, Clone, Default)]
pub struct GeoCache {
    cities: HashMap<(String, String), GeocodedCity>,
}

impl GeoCache {
    pub fn from_cities(cities: Vec<GeocodedCity>) -> Self {
        let cities = cities
            .into_iter()
            .map(|city| ((city.name.clone(), city.state.clone()), city))
            .collect();
        Self { cities }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let cities: Vec<GeocodedCity> = serde_json::from_str(content)?;
        Ok(Self::from_cities(cities))
    }

    /// Load the cache file. A missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no geocoding cache at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(KennzeichenError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read geocoding cache at {}: {}", path.display(), e),
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Coordinates for the town a code derives from. Arbitrary codes never resolve.
    pub fn locate(&self, record: &PlateRecord) -> Option<&GeocodedCity> {
        if record.is_arbitrary() || record.derived_from.is_empty() {
            return None;
        }
        self.cities
            .get(&(record.derived_from.clone(), record.federal_state.clone()))
    }
}
