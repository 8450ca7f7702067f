//! Lifecycle API Server Module
//!
//! HTTP front for the tracking server and the deployment manager. Provides
//! the REST routes for experiments, runs, registered models, model versions
//! and deployments, plus the embedded dashboard.

mod api;
mod dashboard;
mod error;
mod extract;
mod handlers;
mod state;
pub mod views;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::deploy::DeployConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tracking server location, or `memory://` for the offline demo backend
    pub tracking_uri: String,
    pub request_timeout_secs: u64,
    /// SQLite file holding the deployments table
    pub database_path: PathBuf,
    pub deployment_dir: PathBuf,
    pub serving_image: String,
    pub serving_port: u16,
    /// Container runtime binary (`docker`, `podman`, ...)
    pub container_runtime: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_or("API_HOST", "127.0.0.1"),
            port: env_parse("API_PORT", 8000),
            tracking_uri: env_or("MLFLOW_TRACKING_URI", "http://127.0.0.1:5000"),
            request_timeout_secs: env_parse("MLFLOW_TIMEOUT_SECS", 30),
            database_path: PathBuf::from(env_or("DEPLOYMENT_DB", "./deployments.db")),
            deployment_dir: PathBuf::from(env_or("DEPLOYMENT_DIR", "./deployments")),
            serving_image: env_or("SERVING_IMAGE", "my-mlflow-serving-image"),
            serving_port: env_parse("SERVING_PORT", 5001),
            container_runtime: env_or("CONTAINER_RUNTIME", "docker"),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig {
            deployment_dir: self.deployment_dir.clone(),
            serving_image: self.serving_image.clone(),
            serving_port: self.serving_port,
            ..DeployConfig::default()
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        tracking_uri = %config.tracking_uri,
        database = %config.database_path.display(),
        deployment_dir = %config.deployment_dir.display(),
        started_at = %start_time.to_rfc3339(),
        "Initializing server state"
    );

    let state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        serving_image = %config.serving_image,
        serving_port = config.serving_port,
        "Lifecycle API server starting"
    );
    info!(url = %format!("http://{}", addr), "Dashboard available");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
            return;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_config_from_server_config() {
        let config = ServerConfig {
            serving_image: "serve:1".to_string(),
            serving_port: 6000,
            deployment_dir: PathBuf::from("/tmp/deploys"),
            ..ServerConfig::default()
        };
        let deploy = config.deploy_config();
        assert_eq!(deploy.serving_image, "serve:1");
        assert_eq!(deploy.serving_port, 6000);
        assert_eq!(deploy.container_port, 5001);
        assert_eq!(deploy.deployment_dir, PathBuf::from("/tmp/deploys"));
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("MLFLOW_LIFECYCLE_TEST_PORT", "not-a-port");
        assert_eq!(env_parse::<u16>("MLFLOW_LIFECYCLE_TEST_PORT", 8000), 8000);
        std::env::set_var("MLFLOW_LIFECYCLE_TEST_PORT", "9001");
        assert_eq!(env_parse::<u16>("MLFLOW_LIFECYCLE_TEST_PORT", 8000), 9001);
    }
}
