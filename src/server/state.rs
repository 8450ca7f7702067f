//! Application state management

use std::sync::Arc;

use crate::deploy::{ContainerRuntime, DeployError, DeploymentManager, DeploymentStore, DockerCli};
use crate::tracking::{self, TrackingBackend};

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub tracking: Arc<dyn TrackingBackend>,
    pub deployments: DeploymentManager,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Connect to the configured tracking backend, container runtime and database
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let tracking = tracking::connect(&config.tracking_uri, config.request_timeout())?;
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new(config.container_runtime.clone()));
        let store = DeploymentStore::open(&config.database_path)?;
        Ok(Self::with_components(config, tracking, runtime, store)?)
    }

    /// Assemble state from already-built components
    pub fn with_components(
        config: ServerConfig,
        tracking: Arc<dyn TrackingBackend>,
        runtime: Arc<dyn ContainerRuntime>,
        store: DeploymentStore,
    ) -> Result<Self, DeployError> {
        let deployments = DeploymentManager::new(
            config.deploy_config(),
            Arc::clone(&tracking),
            runtime,
            store,
        )?;
        Ok(Self {
            config,
            tracking,
            deployments,
            started_at: chrono::Utc::now(),
        })
    }

    pub fn tracking(&self) -> &dyn TrackingBackend {
        self.tracking.as_ref()
    }
}
