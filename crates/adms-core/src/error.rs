//! Error types for the ADMS core library.

use thiserror::Error;

/// Result type alias using the core Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
///
/// Wire decoding never produces these: malformed terminal input is dropped,
/// not reported. They cover stored data that no longer matches the model.
#[derive(Debug, Error)]
pub enum Error {
    /// A stored command names a variant this build does not know.
    #[error("Unknown command type: {0}")]
    UnknownCommand(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
