use thiserror::Error;

/// Errors that can escape the home storage layer.
///
/// Malformed document contents are never reported here: they are absorbed by the
/// corruption recovery path inside `load()`.
#[derive(Debug, Error)]
pub enum HomeStoreError {
    /// Wrapper around IO errors (reading, writing, creating the home folder).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A home book could not be encoded for writing.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Returned when a player identifier cannot be used as a document key.
    #[error("invalid player id: {0}")]
    InvalidPlayer(String),
}

pub type Result<T> = std::result::Result<T, HomeStoreError>;
