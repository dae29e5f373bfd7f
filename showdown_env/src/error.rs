//! Error types for the Showdown environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Network I/O failed (connect refused, connection reset, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Target endpoint is not serving (dead combatant, dropped link)
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    /// The registry explicitly reported that nothing matched the query
    #[error("Not found: {0}")]
    NotFound(String),

    /// Frame serialization/deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The remote handler answered with an error reply
    #[error("Remote error: {0}")]
    Remote(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The caller's execution context was cancelled
    #[error("Cancelled")]
    Cancelled,
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates an unreachable error.
    pub fn unreachable(target: impl std::fmt::Display) -> Self {
        Self::Unreachable(target.to_string())
    }

    /// Returns true if the registry reported an explicit "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
