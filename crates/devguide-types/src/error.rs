use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the guideline operations
#[derive(Debug, Error)]
pub enum GuidelineError {
    /// Unknown document name or resource identifier
    #[error("Document '{0}' not found")]
    NotFound(String),

    /// Backing content could not be read
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller supplied invalid arguments
    #[error("Invalid request: {0}")]
    Misuse(String),

    /// Encoding or decoding a serialized form failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cached encoding could not be decoded back to text
    #[error("Corrupt encoding: {0}")]
    Corrupt(String),

    /// Feedback store failure (only surfaced by read paths)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GuidelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, GuidelineError>;
