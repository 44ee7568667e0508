use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Sync transport is offline")]
    Offline,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl FolioError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, FolioError::QuotaExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
