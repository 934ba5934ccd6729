//! Error types for voice gate

use thiserror::Error;

/// Result type alias for voice gate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voice gate
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing required input
    #[error("{0}")]
    Validation(String),

    /// Current state does not permit the operation
    #[error("{0}")]
    PreconditionFailed(String),

    /// The speech or classification subprocess failed
    #[error("{0}")]
    Upstream(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the error stems from caller input or state rather than an internal fault
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::PreconditionFailed(_))
    }
}
