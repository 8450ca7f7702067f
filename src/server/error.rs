//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::deploy::DeployError;
use crate::tracking::TrackingError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Failure reported by the tracking server or container runtime; the
    /// message is relayed to the caller as-is
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Tracking failure on a read of a single entity (reported as 404)
    pub fn lookup(err: TrackingError) -> Self {
        ServerError::NotFound(err.to_string())
    }

    /// Tracking failure on a list or mutation (reported as 500)
    pub fn upstream(err: TrackingError) -> Self {
        ServerError::Upstream(err.to_string())
    }
}

impl From<DeployError> for ServerError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::NotFound(_) => ServerError::NotFound(err.to_string()),
            DeployError::InvalidVersion { .. } => ServerError::BadRequest(err.to_string()),
            DeployError::Registry(_)
            | DeployError::ArtifactDownload(_)
            | DeployError::Start(_)
            | DeployError::Stop(_)
            | DeployError::Logs(_) => ServerError::Upstream(err.to_string()),
            DeployError::Database(e) => ServerError::Internal(e.to_string()),
            DeployError::Io(e) => ServerError::Io(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ServerError::Upstream(msg) => {
                tracing::warn!(detail = %msg, "Upstream call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            ServerError::Io(e) => {
                tracing::error!(detail = %e, "IO error");
                (StatusCode::INTERNAL_SERVER_ERROR, "A file system error occurred".to_string())
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_errors_map_to_fixed_statuses() {
        let cases = [
            (DeployError::NotFound(3), StatusCode::NOT_FOUND),
            (
                DeployError::InvalidVersion {
                    model: "m".to_string(),
                    version: "9".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (DeployError::Start("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (DeployError::Stop("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let response = ServerError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_tracking_message_is_relayed() {
        let err = ServerError::upstream(TrackingError::AlreadyExists("Experiment 'x' already exists.".to_string()));
        assert_eq!(
            err.to_string(),
            "Upstream error: RESOURCE_ALREADY_EXISTS: Experiment 'x' already exists."
        );
    }
}
