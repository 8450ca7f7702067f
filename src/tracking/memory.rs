//! In-memory tracking backend
//!
//! Keeps experiments, runs, artifacts and the model registry in process
//! memory. It is a stand-in for tests and for offline demos of the dashboard
//! (`memory://`), not a supported tracking backend: nothing is persisted and
//! only the registry rules the API's own routes depend on are modelled.
//! Production deployments point at a real tracking server.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::entities::{
    Experiment, FileInfo, Metric, ModelStage, ModelVersion, Param, RegisteredModel, Run, RunData,
    RunInfo, RunStatus, Tag, ViewType, LIFECYCLE_ACTIVE, LIFECYCLE_DELETED,
};
use super::error::{Result, TrackingError};
use super::{TrackingBackend, MEMORY_URI};

const DEFAULT_EXPERIMENT_NAME: &str = "Default";
const RUN_NAME_TAG: &str = "mlflow.runName";

struct StoredModel {
    model: RegisteredModel,
    next_version: u64,
}

#[derive(Default)]
struct Registry {
    next_experiment_id: u64,
    experiments: Vec<Experiment>,
    runs: Vec<Run>,
    /// run_id -> artifact path -> contents
    artifacts: HashMap<String, BTreeMap<String, Vec<u8>>>,
    models: Vec<StoredModel>,
    versions: Vec<ModelVersion>,
}

/// Process-local tracking backend
pub struct InMemoryTracking {
    registry: RwLock<Registry>,
}

impl Default for InMemoryTracking {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn experiment_not_found(experiment_id: &str) -> TrackingError {
    TrackingError::NotFound(format!("No Experiment with id={} exists", experiment_id))
}

fn run_not_found(run_id: &str) -> TrackingError {
    TrackingError::NotFound(format!("Run '{}' not found", run_id))
}

fn model_not_found(name: &str) -> TrackingError {
    TrackingError::NotFound(format!("Registered Model with name={} not found", name))
}

fn version_not_found(name: &str, version: &str) -> TrackingError {
    TrackingError::NotFound(format!(
        "Model Version (name={}, version={}) not found",
        name, version
    ))
}

impl InMemoryTracking {
    /// Create a backend holding only the `Default` experiment
    pub fn new() -> Self {
        let backend = Self {
            registry: RwLock::new(Registry::default()),
        };
        {
            let mut registry = backend.registry.write();
            registry.insert_experiment(DEFAULT_EXPERIMENT_NAME);
        }
        backend
    }
}

impl Registry {
    fn insert_experiment(&mut self, name: &str) -> String {
        let id = self.next_experiment_id.to_string();
        self.next_experiment_id += 1;
        let now = now_millis();
        self.experiments.push(Experiment {
            experiment_id: id.clone(),
            name: name.to_string(),
            artifact_location: Some(format!("{}{}", MEMORY_URI, id)),
            lifecycle_stage: LIFECYCLE_ACTIVE.to_string(),
            creation_time: Some(now),
            last_update_time: Some(now),
            tags: Vec::new(),
        });
        id
    }

    fn experiment_mut(&mut self, experiment_id: &str) -> Result<&mut Experiment> {
        self.experiments
            .iter_mut()
            .find(|e| e.experiment_id == experiment_id)
            .ok_or_else(|| experiment_not_found(experiment_id))
    }

    fn name_taken(&self, name: &str) -> bool {
        self.experiments.iter().any(|e| e.name == name)
    }

    fn run(&self, run_id: &str) -> Result<&Run> {
        self.runs
            .iter()
            .find(|r| r.info.run_id == run_id)
            .ok_or_else(|| run_not_found(run_id))
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        self.runs
            .iter_mut()
            .find(|r| r.info.run_id == run_id)
            .ok_or_else(|| run_not_found(run_id))
    }

    fn active_run_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        let run = self.run_mut(run_id)?;
        if run.info.lifecycle_stage != LIFECYCLE_ACTIVE {
            return Err(TrackingError::InvalidArgument(format!(
                "The run {} must be in the 'active' state. Current state is {}.",
                run_id, run.info.lifecycle_stage
            )));
        }
        Ok(run)
    }

    fn set_runs_lifecycle(&mut self, experiment_id: &str, stage: &str) {
        for run in self.runs.iter_mut().filter(|r| r.info.experiment_id == experiment_id) {
            run.info.lifecycle_stage = stage.to_string();
        }
    }

    fn stored_model(&self, name: &str) -> Result<&StoredModel> {
        self.models
            .iter()
            .find(|m| m.model.name == name)
            .ok_or_else(|| model_not_found(name))
    }

    fn stored_model_mut(&mut self, name: &str) -> Result<&mut StoredModel> {
        self.models
            .iter_mut()
            .find(|m| m.model.name == name)
            .ok_or_else(|| model_not_found(name))
    }

    fn version_mut(&mut self, name: &str, version: &str) -> Result<&mut ModelVersion> {
        self.versions
            .iter_mut()
            .find(|v| v.name == name && v.version == version)
            .ok_or_else(|| version_not_found(name, version))
    }

    /// Registered model with its latest version per stage filled in
    fn materialize(&self, stored: &StoredModel) -> RegisteredModel {
        let mut latest: BTreeMap<&str, &ModelVersion> = BTreeMap::new();
        for version in self.versions.iter().filter(|v| v.name == stored.model.name) {
            let stage = version.current_stage.as_deref().unwrap_or("None");
            let newer = latest
                .get(stage)
                .map(|current| version_number(version) > version_number(current))
                .unwrap_or(true);
            if newer {
                latest.insert(stage, version);
            }
        }
        let mut latest_versions: Vec<ModelVersion> = latest.into_values().cloned().collect();
        latest_versions.sort_by_key(version_number);

        RegisteredModel {
            latest_versions,
            ..stored.model.clone()
        }
    }
}

fn version_number(version: &ModelVersion) -> u64 {
    version.version.parse().unwrap_or(0)
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TrackingError::InvalidArgument(format!(
            "{} name must be a non-empty string",
            kind
        )));
    }
    Ok(())
}

#[async_trait]
impl TrackingBackend for InMemoryTracking {
    fn tracking_uri(&self) -> &str {
        MEMORY_URI
    }

    async fn search_experiments(&self, view: ViewType) -> Result<Vec<Experiment>> {
        let registry = self.registry.read();
        Ok(registry
            .experiments
            .iter()
            .filter(|e| view.includes(&e.lifecycle_stage))
            .cloned()
            .collect())
    }

    async fn get_experiment(&self, experiment_id: &str) -> Result<Experiment> {
        let registry = self.registry.read();
        registry
            .experiments
            .iter()
            .find(|e| e.experiment_id == experiment_id)
            .cloned()
            .ok_or_else(|| experiment_not_found(experiment_id))
    }

    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        let registry = self.registry.read();
        Ok(registry.experiments.iter().find(|e| e.name == name).cloned())
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        validate_name("Experiment", name)?;
        let mut registry = self.registry.write();
        if registry.name_taken(name) {
            return Err(TrackingError::AlreadyExists(format!(
                "Experiment '{}' already exists.",
                name
            )));
        }
        Ok(registry.insert_experiment(name))
    }

    async fn rename_experiment(&self, experiment_id: &str, new_name: &str) -> Result<()> {
        validate_name("Experiment", new_name)?;
        let mut registry = self.registry.write();
        if registry
            .experiments
            .iter()
            .any(|e| e.name == new_name && e.experiment_id != experiment_id)
        {
            return Err(TrackingError::AlreadyExists(format!(
                "Experiment '{}' already exists.",
                new_name
            )));
        }
        let experiment = registry.experiment_mut(experiment_id)?;
        if experiment.lifecycle_stage != LIFECYCLE_ACTIVE {
            return Err(TrackingError::InvalidArgument(
                "Cannot rename a non-active experiment.".to_string(),
            ));
        }
        experiment.name = new_name.to_string();
        experiment.last_update_time = Some(now_millis());
        Ok(())
    }

    async fn delete_experiment(&self, experiment_id: &str) -> Result<()> {
        let mut registry = self.registry.write();
        let experiment = registry.experiment_mut(experiment_id)?;
        if experiment.lifecycle_stage == LIFECYCLE_DELETED {
            return Err(TrackingError::InvalidArgument(format!(
                "Experiment {} is already deleted.",
                experiment_id
            )));
        }
        experiment.lifecycle_stage = LIFECYCLE_DELETED.to_string();
        experiment.last_update_time = Some(now_millis());
        registry.set_runs_lifecycle(experiment_id, LIFECYCLE_DELETED);
        Ok(())
    }

    async fn restore_experiment(&self, experiment_id: &str) -> Result<()> {
        let mut registry = self.registry.write();
        let experiment = registry.experiment_mut(experiment_id)?;
        if experiment.lifecycle_stage != LIFECYCLE_DELETED {
            return Err(TrackingError::InvalidArgument(format!(
                "Cannot restore an active experiment {}.",
                experiment_id
            )));
        }
        experiment.lifecycle_stage = LIFECYCLE_ACTIVE.to_string();
        experiment.last_update_time = Some(now_millis());
        registry.set_runs_lifecycle(experiment_id, LIFECYCLE_ACTIVE);
        Ok(())
    }

    async fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<Run> {
        let mut registry = self.registry.write();
        let experiment = registry.experiment_mut(experiment_id)?;
        if experiment.lifecycle_stage != LIFECYCLE_ACTIVE {
            return Err(TrackingError::InvalidArgument(format!(
                "The experiment {} must be in the 'active' state. Current state is {}.",
                experiment_id, experiment.lifecycle_stage
            )));
        }

        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let run_name = run_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("run-{}", &run_id[..8]));
        let run = Run {
            info: RunInfo {
                run_id: run_id.clone(),
                run_name: Some(run_name.clone()),
                experiment_id: experiment_id.to_string(),
                status: RunStatus::Running,
                start_time: Some(now_millis()),
                end_time: None,
                artifact_uri: Some(format!("{}{}/{}/artifacts", MEMORY_URI, experiment_id, run_id)),
                lifecycle_stage: LIFECYCLE_ACTIVE.to_string(),
            },
            data: RunData {
                tags: vec![Tag::new(RUN_NAME_TAG, run_name)],
                ..RunData::default()
            },
        };
        registry.runs.push(run.clone());
        Ok(run)
    }

    async fn get_run(&self, run_id: &str) -> Result<Run> {
        self.registry.read().run(run_id).cloned()
    }

    async fn search_runs(&self, experiment_ids: &[String], view: ViewType) -> Result<Vec<Run>> {
        let registry = self.registry.read();
        let mut runs: Vec<Run> = registry
            .runs
            .iter()
            .filter(|r| experiment_ids.contains(&r.info.experiment_id))
            .filter(|r| view.includes(&r.info.lifecycle_stage))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.info.start_time.cmp(&a.info.start_time));
        Ok(runs)
    }

    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut registry = self.registry.write();
        let run = registry.active_run_mut(run_id)?;
        run.info.status = status;
        run.info.end_time = Some(now_millis());
        Ok(())
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        let mut registry = self.registry.write();
        registry.run_mut(run_id)?.info.lifecycle_stage = LIFECYCLE_DELETED.to_string();
        Ok(())
    }

    async fn restore_run(&self, run_id: &str) -> Result<()> {
        let mut registry = self.registry.write();
        registry.run_mut(run_id)?.info.lifecycle_stage = LIFECYCLE_ACTIVE.to_string();
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        validate_name("Metric", key)?;
        let mut registry = self.registry.write();
        let run = registry.active_run_mut(run_id)?;
        let metric = Metric {
            key: key.to_string(),
            value,
            timestamp: Some(now_millis()),
            step: Some(0),
        };
        match run.data.metrics.iter_mut().find(|m| m.key == key) {
            Some(existing) => *existing = metric,
            None => run.data.metrics.push(metric),
        }
        Ok(())
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        validate_name("Param", key)?;
        let mut registry = self.registry.write();
        let run = registry.active_run_mut(run_id)?;
        match run.data.params.iter().find(|p| p.key == key) {
            Some(existing) if existing.value != value => {
                return Err(TrackingError::InvalidArgument(format!(
                    "Changing param values is not allowed. Param with key='{}' was already logged with value='{}' for run ID='{}'. Attempted logging new value '{}'.",
                    key, existing.value, run_id, value
                )));
            }
            Some(_) => {}
            None => run.data.params.push(Param {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    async fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<FileInfo>> {
        let registry = self.registry.read();
        registry.run(run_id)?;

        let prefix = match path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(p) => format!("{}/", p),
            None => String::new(),
        };
        let mut dirs = BTreeSet::new();
        let mut files = Vec::new();
        if let Some(stored) = registry.artifacts.get(run_id) {
            for (stored_path, contents) in stored {
                let Some(rest) = stored_path.strip_prefix(&prefix) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        dirs.insert(format!("{}{}", prefix, dir));
                    }
                    None => files.push(FileInfo {
                        path: stored_path.clone(),
                        is_dir: false,
                        file_size: Some(contents.len() as i64),
                    }),
                }
            }
        }

        let mut entries: Vec<FileInfo> = dirs
            .into_iter()
            .map(|path| FileInfo {
                path,
                is_dir: true,
                file_size: None,
            })
            .collect();
        entries.extend(files);
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn log_artifact(
        &self,
        run_id: &str,
        local_file: &Path,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TrackingError::InvalidArgument(format!("Not a file path: {}", local_file.display()))
            })?
            .to_string();
        let contents = tokio::fs::read(local_file).await?;

        let target = match artifact_path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(dir) => format!("{}/{}", dir, file_name),
            None => file_name,
        };

        let mut registry = self.registry.write();
        registry.run(run_id)?;
        registry
            .artifacts
            .entry(run_id.to_string())
            .or_default()
            .insert(target, contents);
        Ok(())
    }

    async fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf> {
        let root = path.trim_matches('/').to_string();
        let files: Vec<(String, Vec<u8>)> = {
            let registry = self.registry.read();
            registry.run(run_id)?;
            registry
                .artifacts
                .get(run_id)
                .map(|stored| {
                    stored
                        .iter()
                        .filter(|(p, _)| {
                            root.is_empty() || *p == &root || p.starts_with(&format!("{}/", root))
                        })
                        .map(|(p, c)| (p.clone(), c.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        tokio::fs::create_dir_all(dst).await?;
        for (artifact, contents) in files {
            let target = dst.join(&artifact);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, contents).await?;
        }
        Ok(if root.is_empty() { dst.to_path_buf() } else { dst.join(root) })
    }

    async fn create_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        validate_name("Registered model", name)?;
        let mut registry = self.registry.write();
        if registry.stored_model(name).is_ok() {
            return Err(TrackingError::AlreadyExists(format!(
                "Registered Model (name={}) already exists.",
                name
            )));
        }
        let now = now_millis();
        let model = RegisteredModel {
            name: name.to_string(),
            creation_timestamp: Some(now),
            last_updated_timestamp: Some(now),
            description: None,
            latest_versions: Vec::new(),
            tags: Vec::new(),
        };
        registry.models.push(StoredModel {
            model: model.clone(),
            next_version: 1,
        });
        Ok(model)
    }

    async fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let registry = self.registry.read();
        let stored = registry.stored_model(name)?;
        Ok(registry.materialize(stored))
    }

    async fn rename_registered_model(&self, name: &str, new_name: &str) -> Result<RegisteredModel> {
        validate_name("Registered model", new_name)?;
        let mut registry = self.registry.write();
        if name != new_name && registry.stored_model(new_name).is_ok() {
            return Err(TrackingError::AlreadyExists(format!(
                "Registered Model (name={}) already exists.",
                new_name
            )));
        }
        let stored = registry.stored_model_mut(name)?;
        stored.model.name = new_name.to_string();
        stored.model.last_updated_timestamp = Some(now_millis());
        for version in registry.versions.iter_mut().filter(|v| v.name == name) {
            version.name = new_name.to_string();
        }
        let stored = registry.stored_model(new_name)?;
        Ok(registry.materialize(stored))
    }

    async fn update_registered_model(&self, name: &str, description: &str) -> Result<RegisteredModel> {
        let mut registry = self.registry.write();
        let stored = registry.stored_model_mut(name)?;
        stored.model.description = Some(description.to_string());
        stored.model.last_updated_timestamp = Some(now_millis());
        let stored = registry.stored_model(name)?;
        Ok(registry.materialize(stored))
    }

    async fn delete_registered_model(&self, name: &str) -> Result<()> {
        let mut registry = self.registry.write();
        registry.stored_model(name)?;
        registry.models.retain(|m| m.model.name != name);
        registry.versions.retain(|v| v.name != name);
        Ok(())
    }

    async fn search_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let registry = self.registry.read();
        let mut models: Vec<RegisteredModel> =
            registry.models.iter().map(|m| registry.materialize(m)).collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    async fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()> {
        validate_name("Tag", key)?;
        let mut registry = self.registry.write();
        let stored = registry.stored_model_mut(name)?;
        match stored.model.tags.iter_mut().find(|t| t.key == key) {
            Some(tag) => tag.value = value.to_string(),
            None => stored.model.tags.push(Tag::new(key, value)),
        }
        Ok(())
    }

    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: Option<&str>,
    ) -> Result<ModelVersion> {
        let mut registry = self.registry.write();
        if let Some(run_id) = run_id.filter(|r| !r.is_empty()) {
            registry.run(run_id)?;
        }
        let stored = registry.stored_model_mut(name)?;
        let version = stored.next_version;
        stored.next_version += 1;
        let now = now_millis();
        stored.model.last_updated_timestamp = Some(now);

        let model_version = ModelVersion {
            name: name.to_string(),
            version: version.to_string(),
            creation_timestamp: Some(now),
            last_updated_timestamp: Some(now),
            current_stage: Some(ModelStage::None.to_string()),
            description: None,
            source: Some(source.to_string()),
            run_id: run_id.filter(|r| !r.is_empty()).map(str::to_string),
            status: Some("READY".to_string()),
            status_message: None,
            tags: Vec::new(),
        };
        registry.versions.push(model_version.clone());
        Ok(model_version)
    }

    async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion> {
        let registry = self.registry.read();
        registry
            .versions
            .iter()
            .find(|v| v.name == name && v.version == version)
            .cloned()
            .ok_or_else(|| version_not_found(name, version))
    }

    async fn update_model_version(
        &self,
        name: &str,
        version: &str,
        description: &str,
    ) -> Result<ModelVersion> {
        let mut registry = self.registry.write();
        let model_version = registry.version_mut(name, version)?;
        model_version.description = Some(description.to_string());
        model_version.last_updated_timestamp = Some(now_millis());
        Ok(model_version.clone())
    }

    async fn delete_model_version(&self, name: &str, version: &str) -> Result<()> {
        let mut registry = self.registry.write();
        registry.version_mut(name, version)?;
        registry
            .versions
            .retain(|v| !(v.name == name && v.version == version));
        Ok(())
    }

    async fn transition_model_version_stage(
        &self,
        name: &str,
        version: &str,
        stage: ModelStage,
    ) -> Result<ModelVersion> {
        let mut registry = self.registry.write();
        let model_version = registry.version_mut(name, version)?;
        model_version.current_stage = Some(stage.to_string());
        model_version.last_updated_timestamp = Some(now_millis());
        Ok(model_version.clone())
    }

    async fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let registry = self.registry.read();
        let mut versions: Vec<ModelVersion> = registry
            .versions
            .iter()
            .filter(|v| v.name == name)
            .cloned()
            .collect();
        versions.sort_by_key(|v| std::cmp::Reverse(version_number(v)));
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_experiment_exists() {
        let backend = InMemoryTracking::new();
        let experiments = backend.search_experiments(ViewType::All).await.unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].experiment_id, "0");
        assert_eq!(experiments[0].name, "Default");
    }

    #[tokio::test]
    async fn test_experiment_names_are_unique() {
        let backend = InMemoryTracking::new();
        let id = backend.create_experiment("churn").await.unwrap();
        assert_eq!(id, "1");
        let err = backend.create_experiment("churn").await.unwrap_err();
        assert!(matches!(err, TrackingError::AlreadyExists(_)));

        backend.delete_experiment(&id).await.unwrap();
        // deleted experiments still reserve their name
        assert!(backend.create_experiment("churn").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_restore_cascade_to_runs() {
        let backend = InMemoryTracking::new();
        let id = backend.create_experiment("exp").await.unwrap();
        let run = backend.create_run(&id, Some("r")).await.unwrap();

        backend.delete_experiment(&id).await.unwrap();
        let active = backend.search_experiments(ViewType::ActiveOnly).await.unwrap();
        assert!(active.iter().all(|e| e.experiment_id != id));
        let runs = backend.search_runs(&[id.clone()], ViewType::ActiveOnly).await.unwrap();
        assert!(runs.is_empty());

        backend.restore_experiment(&id).await.unwrap();
        let runs = backend.search_runs(&[id.clone()], ViewType::ActiveOnly).await.unwrap();
        assert_eq!(runs[0].info.run_id, run.info.run_id);
        assert!(backend.restore_experiment(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_param_values_are_immutable() {
        let backend = InMemoryTracking::new();
        let run = backend.create_run("0", None).await.unwrap();
        let run_id = run.info.run_id;
        backend.log_param(&run_id, "lr", "0.1").await.unwrap();
        backend.log_param(&run_id, "lr", "0.1").await.unwrap();
        assert!(backend.log_param(&run_id, "lr", "0.2").await.is_err());
    }

    #[tokio::test]
    async fn test_metrics_keep_latest_value() {
        let backend = InMemoryTracking::new();
        let run_id = backend.create_run("0", None).await.unwrap().info.run_id;
        backend.log_metric(&run_id, "acc", 0.5).await.unwrap();
        backend.log_metric(&run_id, "acc", 0.75).await.unwrap();
        let run = backend.get_run(&run_id).await.unwrap();
        assert_eq!(run.data.metrics.len(), 1);
        assert_eq!(run.data.metrics[0].value, 0.75);
    }

    #[tokio::test]
    async fn test_artifact_listing_is_one_level_deep() {
        let backend = InMemoryTracking::new();
        let run_id = backend.create_run("0", None).await.unwrap().info.run_id;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("MLmodel");
        std::fs::write(&file, "flavors: {}").unwrap();
        backend.log_artifact(&run_id, &file, Some("model")).await.unwrap();
        backend.log_artifact(&run_id, &file, None).await.unwrap();

        let root = backend.list_artifacts(&run_id, None).await.unwrap();
        let paths: Vec<&str> = root.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["MLmodel", "model"]);
        assert!(root[1].is_dir);

        let nested = backend.list_artifacts(&run_id, Some("model")).await.unwrap();
        assert_eq!(nested[0].path, "model/MLmodel");
        assert_eq!(nested[0].file_size, Some(11));

        let out = tempfile::tempdir().unwrap();
        backend.download_artifacts(&run_id, "", out.path()).await.unwrap();
        assert!(out.path().join("model/MLmodel").exists());
        assert!(out.path().join("MLmodel").exists());
    }

    #[tokio::test]
    async fn test_model_versions_are_numbered_per_model() {
        let backend = InMemoryTracking::new();
        backend.create_registered_model("a").await.unwrap();
        backend.create_registered_model("b").await.unwrap();
        let v1 = backend.create_model_version("a", "s3://x", None).await.unwrap();
        let v2 = backend.create_model_version("a", "s3://y", None).await.unwrap();
        let b1 = backend.create_model_version("b", "s3://z", None).await.unwrap();
        assert_eq!((v1.version.as_str(), v2.version.as_str(), b1.version.as_str()), ("1", "2", "1"));

        backend.delete_model_version("a", "2").await.unwrap();
        let v3 = backend.create_model_version("a", "s3://w", None).await.unwrap();
        assert_eq!(v3.version, "3");
    }

    #[tokio::test]
    async fn test_latest_versions_per_stage() {
        let backend = InMemoryTracking::new();
        backend.create_registered_model("m").await.unwrap();
        for _ in 0..3 {
            backend.create_model_version("m", "src", None).await.unwrap();
        }
        backend
            .transition_model_version_stage("m", "1", ModelStage::Production)
            .await
            .unwrap();

        let model = backend.get_registered_model("m").await.unwrap();
        let latest: Vec<(&str, &str)> = model
            .latest_versions
            .iter()
            .map(|v| (v.version.as_str(), v.current_stage.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(latest, vec![("1", "Production"), ("3", "None")]);
    }

    #[tokio::test]
    async fn test_rename_model_carries_versions() {
        let backend = InMemoryTracking::new();
        backend.create_registered_model("old").await.unwrap();
        backend.create_model_version("old", "src", None).await.unwrap();
        let renamed = backend.rename_registered_model("old", "new").await.unwrap();
        assert_eq!(renamed.name, "new");
        assert_eq!(renamed.latest_versions[0].name, "new");
        assert!(backend.get_registered_model("old").await.unwrap_err().is_not_found());
    }
}
