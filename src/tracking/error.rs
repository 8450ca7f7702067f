//! Error types for the tracking client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    /// Error reported by the tracking server itself
    #[error("{code}: {message}")]
    Api {
        code: String,
        message: String,
        status: u16,
    },

    #[error("RESOURCE_DOES_NOT_EXIST: {0}")]
    NotFound(String),

    #[error("RESOURCE_ALREADY_EXISTS: {0}")]
    AlreadyExists(String),

    #[error("INVALID_PARAMETER_VALUE: {0}")]
    InvalidArgument(String),

    #[error("Unsupported artifact URI: {0}")]
    UnsupportedArtifactUri(String),

    #[error("Tracking server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid tracking server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackingError {
    /// MLflow error code carried by this error, when there is one
    pub fn code(&self) -> Option<&str> {
        match self {
            TrackingError::Api { code, .. } => Some(code),
            TrackingError::NotFound(_) => Some("RESOURCE_DOES_NOT_EXIST"),
            TrackingError::AlreadyExists(_) => Some("RESOURCE_ALREADY_EXISTS"),
            TrackingError::InvalidArgument(_) => Some("INVALID_PARAMETER_VALUE"),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some("RESOURCE_DOES_NOT_EXIST")
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;
