//! Error types for the relay engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can reject a transfer up front or terminate it mid-flight.
///
/// `Cancelled` is a terminal outcome rather than a failure; the coordinator
/// maps it to its own terminal state instead of reporting it as an error.
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Declared size is over the configured limit
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },
    /// Destination directory lookup could not be completed
    #[error("Directory lookup failed: {0}")]
    DirectoryUnavailable(String),
    /// Directory lookup succeeded but returned no candidates
    #[error("Directory returned no destinations")]
    EmptyPool,
    /// The request's cancellation token was signaled
    #[error("Transfer cancelled")]
    Cancelled,
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// Publish phase errors
    #[error("Upload error: {0}")]
    Upload(String),
    /// Network related errors
    #[error("Network error: {0}")]
    Network(String),
    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for RelayError {
    fn from(err: url::ParseError) -> Self {
        RelayError::Validation(err.to_string())
    }
}
