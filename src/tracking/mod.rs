//! Experiment Tracking Client
//!
//! Access to the external MLflow tracking server. Every operation the API
//! exposes goes through the [`TrackingBackend`] trait, which has two
//! implementations:
//! - [`MlflowClient`] - talks to a tracking server over its REST API
//! - [`InMemoryTracking`] - process-local registry for offline use and tests
//!
//! [`ops`] holds the few fixed compositions of backend calls (run creation,
//! source resolution for new model versions, mutate-then-refetch).

mod client;
mod entities;
mod error;
mod memory;
pub mod ops;

pub use client::MlflowClient;
pub use entities::{
    Experiment, FileInfo, Metric, ModelStage, ModelVersion, Param, RegisteredModel, Run, RunData,
    RunInfo, RunStatus, Tag, ViewType, LIFECYCLE_ACTIVE, LIFECYCLE_DELETED,
};
pub use error::{Result, TrackingError};
pub use memory::InMemoryTracking;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// URI scheme selecting the in-memory backend (offline demo and tests only)
pub const MEMORY_URI: &str = "memory://";

/// Operations of the tracking service used by this crate
#[async_trait]
pub trait TrackingBackend: Send + Sync {
    /// Human-readable location of the backend
    fn tracking_uri(&self) -> &str;

    // Experiments
    async fn search_experiments(&self, view: ViewType) -> Result<Vec<Experiment>>;
    async fn get_experiment(&self, experiment_id: &str) -> Result<Experiment>;
    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>>;
    async fn create_experiment(&self, name: &str) -> Result<String>;
    async fn rename_experiment(&self, experiment_id: &str, new_name: &str) -> Result<()>;
    async fn delete_experiment(&self, experiment_id: &str) -> Result<()>;
    async fn restore_experiment(&self, experiment_id: &str) -> Result<()>;

    // Runs
    async fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<Run>;
    async fn get_run(&self, run_id: &str) -> Result<Run>;
    async fn search_runs(&self, experiment_ids: &[String], view: ViewType) -> Result<Vec<Run>>;
    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()>;
    async fn delete_run(&self, run_id: &str) -> Result<()>;
    async fn restore_run(&self, run_id: &str) -> Result<()>;
    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;
    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    // Artifacts
    async fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<FileInfo>>;
    async fn log_artifact(
        &self,
        run_id: &str,
        local_file: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()>;
    /// Download the artifact subtree at `path` ("" for the root) into `dst`
    async fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf>;

    // Registered models
    async fn create_registered_model(&self, name: &str) -> Result<RegisteredModel>;
    async fn get_registered_model(&self, name: &str) -> Result<RegisteredModel>;
    async fn rename_registered_model(&self, name: &str, new_name: &str) -> Result<RegisteredModel>;
    async fn update_registered_model(&self, name: &str, description: &str) -> Result<RegisteredModel>;
    async fn delete_registered_model(&self, name: &str) -> Result<()>;
    async fn search_registered_models(&self) -> Result<Vec<RegisteredModel>>;
    async fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()>;

    // Model versions
    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: Option<&str>,
    ) -> Result<ModelVersion>;
    async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion>;
    async fn update_model_version(
        &self,
        name: &str,
        version: &str,
        description: &str,
    ) -> Result<ModelVersion>;
    async fn delete_model_version(&self, name: &str, version: &str) -> Result<()>;
    async fn transition_model_version_stage(
        &self,
        name: &str,
        version: &str,
        stage: ModelStage,
    ) -> Result<ModelVersion>;
    async fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>>;
}

/// Build the backend selected by `tracking_uri`
pub fn connect(tracking_uri: &str, timeout: Duration) -> Result<Arc<dyn TrackingBackend>> {
    if tracking_uri.starts_with(MEMORY_URI) {
        tracing::warn!(
            "memory:// is an offline demo backend: nothing is persisted and it is not a \
             substitute for a tracking server"
        );
        return Ok(Arc::new(InMemoryTracking::new()));
    }
    Ok(Arc::new(MlflowClient::new(tracking_uri, timeout)?))
}
