//! Fixed compositions of tracking calls behind single API operations

use tracing::{debug, info};

use super::entities::{ModelVersion, RegisteredModel, Run, RunStatus, ViewType};
use super::error::{Result, TrackingError};
use super::TrackingBackend;

pub const INIT_STATUS_PARAM: &str = "init_status";
pub const INIT_STATUS_VALUE: &str = "run_started";

/// Create a run, record its start marker and close it immediately.
///
/// The experiment must exist in any lifecycle stage. The returned run is
/// re-fetched after termination so it carries the final status and data.
pub async fn create_run(
    backend: &dyn TrackingBackend,
    experiment_id: &str,
    run_name: &str,
) -> Result<Run> {
    let known = backend.search_experiments(ViewType::All).await?;
    if !known.iter().any(|e| e.experiment_id == experiment_id) {
        return Err(TrackingError::NotFound(format!(
            "Experiment ID {} does not exist.",
            experiment_id
        )));
    }

    let run = backend.create_run(experiment_id, Some(run_name)).await?;
    let run_id = run.info.run_id;
    backend
        .log_param(&run_id, INIT_STATUS_PARAM, INIT_STATUS_VALUE)
        .await?;
    backend.set_terminated(&run_id, RunStatus::Finished).await?;

    info!(run_id = %run_id, experiment_id = %experiment_id, "Run created and terminated");
    backend.get_run(&run_id).await
}

/// Active runs of every experiment, whatever the experiment's own stage
pub async fn list_all_runs(backend: &dyn TrackingBackend) -> Result<Vec<Run>> {
    let experiments = backend.search_experiments(ViewType::All).await?;
    let mut runs = Vec::new();
    for experiment in experiments {
        let found = backend
            .search_runs(&[experiment.experiment_id.clone()], ViewType::ActiveOnly)
            .await?;
        debug!(experiment_id = %experiment.experiment_id, runs = found.len(), "Collected runs");
        runs.extend(found);
    }
    Ok(runs)
}

/// Register a new version of `name`.
///
/// An empty `source` is resolved to the artifact root of `run_id`.
pub async fn create_model_version(
    backend: &dyn TrackingBackend,
    name: &str,
    source: &str,
    run_id: &str,
) -> Result<ModelVersion> {
    let run_id = Some(run_id).filter(|r| !r.is_empty());
    let source = match (source.is_empty(), run_id) {
        (false, _) => source.to_string(),
        (true, Some(run_id)) => backend
            .get_run(run_id)
            .await?
            .info
            .artifact_uri
            .unwrap_or_default(),
        (true, None) => {
            return Err(TrackingError::InvalidArgument(
                "Either a source or a run_id is required to create a model version".to_string(),
            ))
        }
    };
    backend.create_model_version(name, &source, run_id).await
}

pub async fn create_registered_model(
    backend: &dyn TrackingBackend,
    name: &str,
) -> Result<RegisteredModel> {
    backend.create_registered_model(name).await?;
    backend.get_registered_model(name).await
}

pub async fn rename_registered_model(
    backend: &dyn TrackingBackend,
    name: &str,
    new_name: &str,
) -> Result<RegisteredModel> {
    backend.rename_registered_model(name, new_name).await?;
    backend.get_registered_model(new_name).await
}

pub async fn update_registered_model(
    backend: &dyn TrackingBackend,
    name: &str,
    description: &str,
) -> Result<RegisteredModel> {
    backend.update_registered_model(name, description).await?;
    backend.get_registered_model(name).await
}

pub async fn update_model_version(
    backend: &dyn TrackingBackend,
    name: &str,
    version: &str,
    description: &str,
) -> Result<ModelVersion> {
    backend.update_model_version(name, version, description).await?;
    backend.get_model_version(name, version).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::InMemoryTracking;

    #[tokio::test]
    async fn test_create_run_finishes_and_marks_start() {
        let backend = InMemoryTracking::new();
        let run = create_run(&backend, "0", "baseline").await.unwrap();
        assert_eq!(run.info.status, RunStatus::Finished);
        assert_eq!(run.info.run_name.as_deref(), Some("baseline"));
        assert!(run.info.end_time.is_some());
        assert!(run
            .data
            .params
            .iter()
            .any(|p| p.key == INIT_STATUS_PARAM && p.value == INIT_STATUS_VALUE));
    }

    #[tokio::test]
    async fn test_create_run_unknown_experiment() {
        let backend = InMemoryTracking::new();
        let err = create_run(&backend, "42", "x").await.unwrap_err();
        assert!(err.to_string().contains("Experiment ID 42 does not exist."));
    }

    #[tokio::test]
    async fn test_model_version_source_from_run() {
        let backend = InMemoryTracking::new();
        let run = create_run(&backend, "0", "train").await.unwrap();
        backend.create_registered_model("clf").await.unwrap();

        let mv = create_model_version(&backend, "clf", "", &run.info.run_id).await.unwrap();
        assert_eq!(mv.source, run.info.artifact_uri);
        assert_eq!(mv.run_id.as_deref(), Some(run.info.run_id.as_str()));

        let err = create_model_version(&backend, "clf", "", "").await.unwrap_err();
        assert!(matches!(err, TrackingError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_list_all_runs_spans_experiments() {
        let backend = InMemoryTracking::new();
        let other = backend.create_experiment("other").await.unwrap();
        create_run(&backend, "0", "a").await.unwrap();
        create_run(&backend, &other, "b").await.unwrap();
        let deleted = create_run(&backend, &other, "c").await.unwrap();
        backend.delete_run(&deleted.info.run_id).await.unwrap();

        let runs = list_all_runs(&backend).await.unwrap();
        assert_eq!(runs.len(), 2);
    }
}
