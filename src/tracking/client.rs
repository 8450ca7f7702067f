//! REST client for an MLflow tracking server

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::entities::{
    Experiment, FileInfo, ModelStage, ModelVersion, RegisteredModel, Run, RunStatus, ViewType,
};
use super::error::{Result, TrackingError};
use super::TrackingBackend;

const API_PREFIX: &str = "api/2.0/mlflow";
const ARTIFACTS_PREFIX: &str = "api/2.0/mlflow-artifacts/artifacts";
const PAGE_SIZE: usize = 1000;

/// Client for the MLflow REST API
#[derive(Debug, Clone)]
pub struct MlflowClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct Empty {}

#[derive(Deserialize)]
struct SearchExperimentsResponse {
    #[serde(default)]
    experiments: Vec<Experiment>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ExperimentResponse {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<Run>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ListArtifactsResponse {
    #[serde(default)]
    files: Vec<FileInfo>,
}

#[derive(Deserialize)]
struct RegisteredModelResponse {
    registered_model: RegisteredModel,
}

#[derive(Deserialize)]
struct SearchRegisteredModelsResponse {
    #[serde(default)]
    registered_models: Vec<RegisteredModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ModelVersionResponse {
    model_version: ModelVersion,
}

#[derive(Deserialize)]
struct SearchModelVersionsResponse {
    #[serde(default)]
    model_versions: Vec<ModelVersion>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl MlflowClient {
    /// Create a client for the tracking server at `tracking_uri`
    pub fn new(tracking_uri: &str, timeout: Duration) -> Result<Self> {
        let parsed = url::Url::parse(tracking_uri)
            .map_err(|e| TrackingError::InvalidArgument(format!("Invalid tracking URI '{}': {}", tracking_uri, e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(TrackingError::InvalidArgument(format!(
                    "Unsupported tracking URI scheme '{}'. Use http, https or memory.",
                    scheme
                )))
            }
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mlflow-lifecycle/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(tracking_uri = %tracking_uri, timeout_secs = timeout.as_secs(), "MLflow client configured");

        Ok(Self {
            base_url: tracking_uri.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(method = "GET", path = %path, "Tracking request");
        let response = self.http.get(self.endpoint(path)).query(query).send().await?;
        decode(response).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(method = %method, path = %path, "Tracking request");
        let response = self
            .http
            .request(method, self.endpoint(path))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(Method::POST, path, body).await
    }

    /// Path of a run's artifact root on the artifact proxy
    fn proxied_artifact_root(artifact_uri: &str) -> Result<String> {
        if !artifact_uri.starts_with("mlflow-artifacts:") {
            return Err(TrackingError::UnsupportedArtifactUri(format!(
                "{} (only mlflow-artifacts: URIs can be written through the tracking server)",
                artifact_uri
            )));
        }
        let parsed = url::Url::parse(artifact_uri)
            .map_err(|_| TrackingError::UnsupportedArtifactUri(artifact_uri.to_string()))?;
        Ok(parsed.path().trim_matches('/').to_string())
    }

    async fn download_file(&self, run_id: &str, path: &str, dst: &Path) -> Result<()> {
        debug!(run_id = %run_id, path = %path, "Downloading artifact");
        let response = self
            .http
            .get(format!("{}/get-artifact", self.base_url))
            .query(&[("path", path), ("run_id", run_id)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_error(status, &body));
        }
        let bytes = response.bytes().await?;

        let target = dst.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    if body.is_empty() {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(&body)?)
}

fn api_error(status: StatusCode, body: &[u8]) -> TrackingError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
    let (code, message) = match parsed {
        Some(ErrorBody { error_code, message }) => (error_code, message),
        None => (None, None),
    };
    let code = code.unwrap_or_else(|| match status {
        StatusCode::NOT_FOUND => "RESOURCE_DOES_NOT_EXIST".to_string(),
        StatusCode::BAD_REQUEST => "INVALID_PARAMETER_VALUE".to_string(),
        _ => "INTERNAL_ERROR".to_string(),
    });
    let message = message.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            format!("Tracking server responded with status {}", status.as_u16())
        } else {
            text
        }
    });
    TrackingError::Api {
        code,
        message,
        status: status.as_u16(),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl TrackingBackend for MlflowClient {
    fn tracking_uri(&self) -> &str {
        &self.base_url
    }

    async fn search_experiments(&self, view: ViewType) -> Result<Vec<Experiment>> {
        let mut experiments = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({ "view_type": view, "max_results": PAGE_SIZE });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }
            let page: SearchExperimentsResponse = self.post("experiments/search", &body).await?;
            experiments.extend(page.experiments);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(experiments)
    }

    async fn get_experiment(&self, experiment_id: &str) -> Result<Experiment> {
        let response: ExperimentResponse = self
            .get("experiments/get", &[("experiment_id", experiment_id)])
            .await?;
        Ok(response.experiment)
    }

    async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        match self
            .get::<ExperimentResponse>("experiments/get-by-name", &[("experiment_name", name)])
            .await
        {
            Ok(response) => Ok(Some(response.experiment)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_experiment(&self, name: &str) -> Result<String> {
        let response: CreateExperimentResponse = self
            .post("experiments/create", &json!({ "name": name }))
            .await?;
        Ok(response.experiment_id)
    }

    async fn rename_experiment(&self, experiment_id: &str, new_name: &str) -> Result<()> {
        let _: Empty = self
            .post(
                "experiments/update",
                &json!({ "experiment_id": experiment_id, "new_name": new_name }),
            )
            .await?;
        Ok(())
    }

    async fn delete_experiment(&self, experiment_id: &str) -> Result<()> {
        let _: Empty = self
            .post("experiments/delete", &json!({ "experiment_id": experiment_id }))
            .await?;
        Ok(())
    }

    async fn restore_experiment(&self, experiment_id: &str) -> Result<()> {
        let _: Empty = self
            .post("experiments/restore", &json!({ "experiment_id": experiment_id }))
            .await?;
        Ok(())
    }

    async fn create_run(&self, experiment_id: &str, run_name: Option<&str>) -> Result<Run> {
        let mut body = json!({ "experiment_id": experiment_id, "start_time": now_millis() });
        if let Some(name) = run_name.filter(|n| !n.is_empty()) {
            body["run_name"] = json!(name);
        }
        let response: RunResponse = self.post("runs/create", &body).await?;
        Ok(response.run)
    }

    async fn get_run(&self, run_id: &str) -> Result<Run> {
        let response: RunResponse = self.get("runs/get", &[("run_id", run_id)]).await?;
        Ok(response.run)
    }

    async fn search_runs(&self, experiment_ids: &[String], view: ViewType) -> Result<Vec<Run>> {
        let mut runs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut body = json!({
                "experiment_ids": experiment_ids,
                "run_view_type": view,
                "max_results": PAGE_SIZE,
            });
            if let Some(token) = &page_token {
                body["page_token"] = json!(token);
            }
            let page: SearchRunsResponse = self.post("runs/search", &body).await?;
            runs.extend(page.runs);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(runs)
    }

    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let _: Empty = self
            .post(
                "runs/update",
                &json!({ "run_id": run_id, "status": status, "end_time": now_millis() }),
            )
            .await?;
        Ok(())
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        let _: Empty = self.post("runs/delete", &json!({ "run_id": run_id })).await?;
        Ok(())
    }

    async fn restore_run(&self, run_id: &str) -> Result<()> {
        let _: Empty = self.post("runs/restore", &json!({ "run_id": run_id })).await?;
        Ok(())
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        let _: Empty = self
            .post(
                "runs/log-metric",
                &json!({
                    "run_id": run_id,
                    "key": key,
                    "value": value,
                    "timestamp": now_millis(),
                    "step": 0,
                }),
            )
            .await?;
        Ok(())
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: Empty = self
            .post(
                "runs/log-parameter",
                &json!({ "run_id": run_id, "key": key, "value": value }),
            )
            .await?;
        Ok(())
    }

    async fn list_artifacts(&self, run_id: &str, path: Option<&str>) -> Result<Vec<FileInfo>> {
        let mut query = vec![("run_id", run_id)];
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            query.push(("path", path));
        }
        let response: ListArtifactsResponse = self.get("artifacts/list", &query).await?;
        Ok(response.files)
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

        let run = self.get_run(run_id).await?;
        let artifact_uri = run.info.artifact_uri.unwrap_or_default();
        let mut target = Self::proxied_artifact_root(&artifact_uri)?;
        if let Some(dir) = artifact_path.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            target.push('/');
            target.push_str(dir);
        }
        target.push('/');
        target.push_str(&file_name);

        debug!(run_id = %run_id, target = %target, bytes = contents.len(), "Uploading artifact");
        let response = self
            .http
            .put(format!("{}/{}/{}", self.base_url, ARTIFACTS_PREFIX, target))
            .body(contents)
            .send()
            .await?;
        let _: Empty = decode(response).await?;
        Ok(())
    }

    async fn download_artifacts(&self, run_id: &str, path: &str, dst: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dst).await?;

        let root = path.trim_matches('/').to_string();
        let mut pending = vec![root.clone()];
        let mut downloaded = 0usize;
        while let Some(dir) = pending.pop() {
            let entries = self.list_artifacts(run_id, Some(&dir)).await?;
            if entries.is_empty() && !dir.is_empty() && dir == root {
                // `path` names a single file rather than a directory
                self.download_file(run_id, &dir, dst).await?;
                downloaded += 1;
                continue;
            }
            for entry in entries {
                if entry.is_dir {
                    pending.push(entry.path);
                } else {
                    self.download_file(run_id, &entry.path, dst).await?;
                    downloaded += 1;
                }
            }
        }

        info!(run_id = %run_id, files = downloaded, dst = %dst.display(), "Artifacts downloaded");
        Ok(if root.is_empty() { dst.to_path_buf() } else { dst.join(root) })
    }

    async fn create_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse = self
            .post("registered-models/create", &json!({ "name": name }))
            .await?;
        Ok(response.registered_model)
    }

    async fn get_registered_model(&self, name: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse = self
            .get("registered-models/get", &[("name", name)])
            .await?;
        Ok(response.registered_model)
    }

    async fn rename_registered_model(&self, name: &str, new_name: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse = self
            .post(
                "registered-models/rename",
                &json!({ "name": name, "new_name": new_name }),
            )
            .await?;
        Ok(response.registered_model)
    }

    async fn update_registered_model(&self, name: &str, description: &str) -> Result<RegisteredModel> {
        let response: RegisteredModelResponse = self
            .send(
                Method::PATCH,
                "registered-models/update",
                &json!({ "name": name, "description": description }),
            )
            .await?;
        Ok(response.registered_model)
    }

    async fn delete_registered_model(&self, name: &str) -> Result<()> {
        let _: Empty = self
            .send(Method::DELETE, "registered-models/delete", &json!({ "name": name }))
            .await?;
        Ok(())
    }

    async fn search_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let max_results = PAGE_SIZE.to_string();
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("max_results", max_results.as_str())];
            if let Some(token) = &page_token {
                query.push(("page_token", token.as_str()));
            }
            let page: SearchRegisteredModelsResponse =
                self.get("registered-models/search", &query).await?;
            models.extend(page.registered_models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(models)
    }

    async fn set_registered_model_tag(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let _: Empty = self
            .post(
                "registered-models/set-tag",
                &json!({ "name": name, "key": key, "value": value }),
            )
            .await?;
        Ok(())
    }

    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: Option<&str>,
    ) -> Result<ModelVersion> {
        let mut body = json!({ "name": name, "source": source });
        if let Some(run_id) = run_id.filter(|r| !r.is_empty()) {
            body["run_id"] = json!(run_id);
        }
        let response: ModelVersionResponse = self.post("model-versions/create", &body).await?;
        Ok(response.model_version)
    }

    async fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion> {
        let response: ModelVersionResponse = self
            .get("model-versions/get", &[("name", name), ("version", version)])
            .await?;
        Ok(response.model_version)
    }

    async fn update_model_version(
        &self,
        name: &str,
        version: &str,
        description: &str,
    ) -> Result<ModelVersion> {
        let response: ModelVersionResponse = self
            .send(
                Method::PATCH,
                "model-versions/update",
                &json!({ "name": name, "version": version, "description": description }),
            )
            .await?;
        Ok(response.model_version)
    }

    async fn delete_model_version(&self, name: &str, version: &str) -> Result<()> {
        let _: Empty = self
            .send(
                Method::DELETE,
                "model-versions/delete",
                &json!({ "name": name, "version": version }),
            )
            .await?;
        Ok(())
    }

    async fn transition_model_version_stage(
        &self,
        name: &str,
        version: &str,
        stage: ModelStage,
    ) -> Result<ModelVersion> {
        let response: ModelVersionResponse = self
            .post(
                "model-versions/transition-stage",
                &json!({
                    "name": name,
                    "version": version,
                    "stage": stage.as_str(),
                    "archive_existing_versions": false,
                }),
            )
            .await?;
        Ok(response.model_version)
    }

    async fn search_model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let filter = format!("name='{}'", name.replace('\'', "\\'"));
        let max_results = PAGE_SIZE.to_string();
        let mut versions = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("filter", filter.as_str()), ("max_results", max_results.as_str())];
            if let Some(token) = &page_token {
                query.push(("page_token", token.as_str()));
            }
            let page: SearchModelVersionsResponse = self.get("model-versions/search", &query).await?;
            versions.extend(page.model_versions);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(versions)
    }
}
