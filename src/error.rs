use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt stored batch at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Statement parsing failed: {0}")]
    ParseFailed(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid period key: {0}")]
    InvalidPeriod(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    /// True for failures caused by the caller's input rather than by storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidFilter(_) | LedgerError::InvalidPeriod(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
