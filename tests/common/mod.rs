#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A small slice of the real dataset: enough codes to exercise prefix
/// precedence, content fallback, umlauts and state grouping.
pub const FIXTURE_DATASET: &str = r#"{
  "license_plates": [
    {"code": "B", "city_district": "Berlin", "derived_from": "Berlin", "federal_state": "Berlin"},
    {"code": "BN", "city_district": "Bonn", "derived_from": "Bonn", "federal_state": "Nordrhein-Westfalen"},
    {"code": "BO", "city_district": "Bochum", "derived_from": "Bochum", "federal_state": "Nordrhein-Westfalen"},
    {"code": "HH", "city_district": "Hamburg", "derived_from": "Hansestadt Hamburg", "federal_state": "Hamburg"},
    {"code": "M", "city_district": "München", "derived_from": "München", "federal_state": "Bayern"},
    {"code": "LÖ", "city_district": "Lörrach", "derived_from": "Lörrach", "federal_state": "Baden-Württemberg"},
    {"code": "OA", "city_district": "Oberallgäu", "derived_from": "Oberallgäu", "federal_state": "Bayern"},
    {"code": "Y", "city_district": "Bundeswehr", "derived_from": "willkürlich gewählt", "federal_state": "Bund"}
  ],
  "metadata": {"source": "fixture", "description": "test data", "last_updated": "2024-01-01", "note": ""}
}"#;

pub const FIXTURE_GEOCACHE: &str = r#"[
  {"name": "Bonn", "state": "Nordrhein-Westfalen", "lat": 50.73743, "lng": 7.098207}
]"#;

/// Runs the kennzeichen binary against an isolated data root.
pub struct KennzeichenTest {
    pub temp_dir: TempDir,
    binary_path: String,
}

impl KennzeichenTest {
    /// A data root with the fixture dataset and geocache installed.
    pub fn new() -> Self {
        let test = Self::empty();
        fs::create_dir_all(test.root()).expect("Failed to create data root");
        fs::write(test.root().join("license-plates.json"), FIXTURE_DATASET)
            .expect("Failed to write dataset");
        fs::write(test.root().join("german-cities.json"), FIXTURE_GEOCACHE)
            .expect("Failed to write geocache");
        test
    }

    /// A data root with nothing in it.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        KennzeichenTest {
            temp_dir,
            binary_path: env!("CARGO_BIN_EXE_kennzeichen").to_string(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join(".kennzeichen")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(&self.binary_path)
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("KENNZEICHEN_ROOT")
            .env_remove("KENNZEICHEN_API_KEY")
            .output()
            .expect("Failed to execute kennzeichen command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded",
            args
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let mut args = args.to_vec();
        args.push("--json");
        let stdout = self.run_success(&args);
        serde_json::from_str(&stdout).expect("Command did not print valid JSON")
    }

    pub fn read_storage(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.root().join("storage").join(format!("{key}.json"))).ok()
    }
}
