use thiserror::Error;

use crate::tracking::TrackingError;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deployment not found")]
    NotFound(i64),

    #[error("Invalid model version")]
    InvalidVersion { model: String, version: String },

    #[error("Failed to look up model versions: {0}")]
    Registry(#[source] TrackingError),

    #[error("Failed to download model artifacts: {0}")]
    ArtifactDownload(String),

    #[error("Failed to start deployment: {0}")]
    Start(String),

    #[error("Failed to stop deployment container")]
    Stop(String),

    #[error("Failed to fetch deployment logs")]
    Logs(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single container runtime invocation
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("could not launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, DeployError>;
