//! Model Deployment Manager
//!
//! Launches a registered model version in a serving container and keeps a
//! row per deployment in the `deployments` table. Creating a deployment is a
//! straight sequence:
//!
//! 1. check the version exists in the model registry
//! 2. download the artifacts of the run that produced it
//! 3. start the serving container on the configured port
//! 4. insert the row with status `Running`
//!
//! There is no retry, health checking or port allocation, and the table is
//! never reconciled against what the runtime actually runs.

mod error;
mod runtime;
mod store;

pub use error::{DeployError, Result, RuntimeError};
pub use runtime::{container_name, ContainerRuntime, ContainerSpec, DockerCli};
pub use store::{Deployment, DeploymentStore};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::tracking::TrackingBackend;

/// Status recorded for a freshly started deployment
pub const STATUS_RUNNING: &str = "Running";
/// Number of log lines returned for a deployment
pub const LOG_TAIL: usize = 50;

/// Deployment settings
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Where model artifacts are downloaded before being mounted
    pub deployment_dir: PathBuf,
    pub serving_image: String,
    /// Host port every serving container is published on
    pub serving_port: u16,
    /// Port the serving image listens on inside the container
    pub container_port: u16,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            deployment_dir: PathBuf::from("./deployments"),
            serving_image: "my-mlflow-serving-image".to_string(),
            serving_port: 5001,
            container_port: 5001,
        }
    }
}

/// Result of a successful create
#[derive(Debug, Clone, Serialize)]
pub struct CreatedDeployment {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub version: String,
    pub port: u16,
    pub container: String,
}

pub struct DeploymentManager {
    config: DeployConfig,
    tracking: Arc<dyn TrackingBackend>,
    runtime: Arc<dyn ContainerRuntime>,
    store: DeploymentStore,
}

impl DeploymentManager {
    pub fn new(
        config: DeployConfig,
        tracking: Arc<dyn TrackingBackend>,
        runtime: Arc<dyn ContainerRuntime>,
        store: DeploymentStore,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.deployment_dir)?;
        Ok(Self {
            config,
            tracking,
            runtime,
            store,
        })
    }

    pub fn list(&self) -> Result<Vec<Deployment>> {
        self.store.list()
    }

    pub fn get(&self, id: i64) -> Result<Deployment> {
        self.store.get(id)?.ok_or(DeployError::NotFound(id))
    }

    pub async fn create(&self, name: &str, model: &str, version: &str) -> Result<CreatedDeployment> {
        let versions = self
            .tracking
            .search_model_versions(model)
            .await
            .map_err(DeployError::Registry)?;
        let model_version = versions
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| DeployError::InvalidVersion {
                model: model.to_string(),
                version: version.to_string(),
            })?;

        let local_path = self.config.deployment_dir.join(model_dir_name(model, version));
        let run_id = model_version
            .run_id
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                DeployError::ArtifactDownload(format!(
                    "model version {} of '{}' is not linked to a run",
                    version, model
                ))
            })?;
        // A redeploy must not mount files left over from an earlier download
        if tokio::fs::try_exists(&local_path).await? {
            tokio::fs::remove_dir_all(&local_path).await?;
        }
        self.tracking
            .download_artifacts(&run_id, "", &local_path)
            .await
            .map_err(|e| DeployError::ArtifactDownload(e.to_string()))?;
        info!(model = %model, version = %version, path = %local_path.display(), "Model artifacts downloaded");

        let spec = ContainerSpec {
            name: container_name(model, version),
            image: self.config.serving_image.clone(),
            host_port: self.config.serving_port,
            container_port: self.config.container_port,
            model_dir: absolute(local_path)?,
        };
        if let Err(e) = self.runtime.run(&spec).await {
            error!(container = %spec.name, error = %e, "Container start failed");
            return Err(DeployError::Start(e.to_string()));
        }

        let row = self.store.insert(name, model, version, STATUS_RUNNING)?;
        info!(id = row.id, name = %name, container = %spec.name, port = spec.host_port, "Deployment created");

        Ok(CreatedDeployment {
            id: row.id,
            name: row.name,
            model: row.model,
            version: row.version,
            port: spec.host_port,
            container: spec.name,
        })
    }

    pub fn update_status(&self, id: i64, status: &str) -> Result<()> {
        if !self.store.update_status(id, status)? {
            return Err(DeployError::NotFound(id));
        }
        info!(id, status = %status, "Deployment status updated");
        Ok(())
    }

    /// Stop the container, then forget the deployment
    pub async fn delete(&self, id: i64) -> Result<()> {
        let deployment = self.get(id)?;
        let container = container_name(&deployment.model, &deployment.version);
        if let Err(e) = self.runtime.stop(&container).await {
            warn!(id, container = %container, error = %e, "Container stop failed");
            return Err(DeployError::Stop(e.to_string()));
        }
        self.store.delete(id)?;
        info!(id, container = %container, "Deployment stopped and deleted");
        Ok(())
    }

    pub async fn logs(&self, id: i64) -> Result<Vec<String>> {
        let deployment = self.get(id)?;
        let container = container_name(&deployment.model, &deployment.version);
        let text = self
            .runtime
            .logs(&container, LOG_TAIL)
            .await
            .map_err(|e| DeployError::Logs(e.to_string()))?;
        Ok(text.split('\n').map(str::to_string).collect())
    }
}

/// Directory under `deployment_dir` holding one version's artifacts.
/// Registered model names may contain path separators or `..`, so the name
/// is reduced to a single `[A-Za-z0-9_.-]` component.
pub fn model_dir_name(model: &str, version: &str) -> String {
    let mut name: String = format!("{}_{}", model, version)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while name.contains("..") {
        name = name.replace("..", "_");
    }
    name
}

/// Bind mounts need an absolute host path
fn absolute(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dir_name_is_one_component() {
        assert_eq!(model_dir_name("clf", "1"), "clf_1");
        assert_eq!(model_dir_name("fraud.v2", "3"), "fraud.v2_3");
        assert_eq!(model_dir_name("team/fraud model", "1"), "team_fraud_model_1");

        let escaped = model_dir_name("../../escaped", "1");
        assert!(!escaped.contains(".."), "{}", escaped);
        assert!(!escaped.contains('/'), "{}", escaped);

        let root = PathBuf::from("/srv/deployments");
        let joined = root.join(model_dir_name("../../escaped", "1"));
        assert_eq!(joined.parent(), Some(root.as_path()));
        let joined = root.join(model_dir_name("..", ".."));
        assert_eq!(joined.parent(), Some(root.as_path()));
    }
}
