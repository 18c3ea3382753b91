use thiserror::Error;

#[derive(Error, Debug)]
pub enum KennzeichenError {
    #[error("license plate code '{0}' not found")]
    CodeNotFound(String),

    #[error("invalid license plate code '{0}'")]
    InvalidCode(String),

    #[error("invalid import data: {0}")]
    InvalidImport(String),

    #[error("invalid view mode '{0}', expected 'alphabetical' or 'grouped'")]
    InvalidViewMode(String),

    #[error("invalid language '{0}', expected 'de' or 'en'")]
    InvalidLanguage(String),

    #[error("invalid theme '{0}', expected 'system', 'light' or 'dark'")]
    InvalidTheme(String),

    #[error("invalid sync status '{0}'")]
    InvalidSyncStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("configuration error: {0}")]
    Config(String),

    // Sync errors
    #[error("sync is not available: {0}")]
    SyncUnavailable(String),

    #[error("sync code '{0}' not found")]
    AliasNotFound(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KennzeichenError>;
