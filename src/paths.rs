use std::path::PathBuf;

/// Returns the root data directory.
///
/// Resolution order:
/// 1. `KENNZEICHEN_ROOT` environment variable (if set)
/// 2. Current working directory + `.kennzeichen`
pub fn kennzeichen_root() -> PathBuf {
    if let Ok(root) = std::env::var("KENNZEICHEN_ROOT") {
        PathBuf::from(root)
    } else {
        PathBuf::from(".kennzeichen")
    }
}

/// Returns the directory holding one JSON file per persisted key.
pub fn storage_dir() -> PathBuf {
    kennzeichen_root().join("storage")
}

/// Default location of the license plate dataset.
pub fn default_dataset_path() -> PathBuf {
    kennzeichen_root().join("license-plates.json")
}

/// Default location of the geocoding cache.
pub fn default_geocache_path() -> PathBuf {
    kennzeichen_root().join("german-cities.json")
}

/// Platform data directory, used by `config show` to hint where a shared
/// dataset can live outside the working directory.
pub fn platform_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("de", "kennzeichen", "kennzeichen")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_root_default() {
        // SAFETY: We use #[serial] to ensure single-threaded access
        unsafe { std::env::remove_var("KENNZEICHEN_ROOT") };
        assert_eq!(kennzeichen_root(), PathBuf::from(".kennzeichen"));
        assert_eq!(storage_dir(), PathBuf::from(".kennzeichen/storage"));
    }

    #[test]
    #[serial]
    fn test_root_with_env_var() {
        // SAFETY: We use #[serial] to ensure single-threaded access
        unsafe { std::env::set_var("KENNZEICHEN_ROOT", "/custom/path") };
        assert_eq!(kennzeichen_root(), PathBuf::from("/custom/path"));
        assert_eq!(
            default_dataset_path(),
            PathBuf::from("/custom/path/license-plates.json")
        );
        unsafe { std::env::remove_var("KENNZEICHEN_ROOT") };
    }
}
