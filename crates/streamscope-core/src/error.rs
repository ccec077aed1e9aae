//! Error types for Streamscope Core

use thiserror::Error;

/// Result type alias for lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lifecycle error types
///
/// Every variant is terminal only for the request that produced it; the
/// manager stays ready for the next `load_stream` call.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Stream URL is empty")]
    EmptyUrl,

    #[error("No playback strategy can handle {url}")]
    UnsupportedFormat { url: String },

    // Collaborator errors
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a collaborator error
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        Error::Collaborator {
            collaborator,
            message: message.into(),
        }
    }

    /// Returns true if retrying with different input can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::EmptyUrl | Error::UnsupportedFormat { .. } | Error::Collaborator { .. }
        )
    }

    /// Returns the error code used in event records and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::EmptyUrl => "EMPTY_URL",
            Error::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Error::Collaborator { .. } => "COLLABORATOR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::Io(_) => "IO",
        }
    }
}
