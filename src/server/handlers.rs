//! HTTP request handlers
//!
//! Scalar inputs arrive as query parameters. Reads of a single entity report
//! tracking failures as 404, every other tracking failure as 500, and in
//! both cases the tracking server's message is the error detail.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::Html, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::deploy::Deployment;
use crate::tracking::{ops, ModelStage, ViewType};

use super::dashboard::DASHBOARD_HTML;
use super::error::{Result, ServerError};
use super::extract::{Path, Query};
use super::state::AppState;
use super::views::{
    ExperimentDetail, ExperimentSummary, ModelVersionView, RegisteredModelView, RunView,
};

#[derive(Deserialize)]
pub struct NameQuery {
    name: String,
}

#[derive(Deserialize)]
pub struct NewNameQuery {
    new_name: String,
}

#[derive(Deserialize)]
pub struct DescriptionQuery {
    description: String,
}

// ============================================================================
// System Handlers
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "tracking_uri": state.tracking().tracking_uri(),
        "serving_port": state.config.serving_port,
        "uptime_secs": uptime.num_seconds(),
    }))
}

pub async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ============================================================================
// Experiment Handlers
// ============================================================================

pub async fn list_experiments(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let experiments = state
        .tracking()
        .search_experiments(ViewType::All)
        .await
        .map_err(ServerError::upstream)?;
    let experiments: Vec<ExperimentSummary> = experiments.iter().map(ExperimentSummary::from).collect();
    Ok(Json(json!({ "experiments": experiments })))
}

pub async fn get_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
) -> Result<Json<ExperimentDetail>> {
    let experiment = state
        .tracking()
        .get_experiment(&experiment_id)
        .await
        .map_err(ServerError::lookup)?;
    Ok(Json(ExperimentDetail::from(&experiment)))
}

pub async fn get_experiment_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ExperimentDetail>> {
    let experiment = state
        .tracking()
        .get_experiment_by_name(&name)
        .await
        .map_err(ServerError::lookup)?
        .ok_or_else(|| ServerError::NotFound("Experiment not found".to_string()))?;
    Ok(Json(ExperimentDetail::from(&experiment)))
}

pub async fn create_experiment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>> {
    let id = state
        .tracking()
        .create_experiment(&query.name)
        .await
        .map_err(ServerError::upstream)?;
    info!(experiment_id = %id, name = %query.name, "Experiment created");
    Ok(Json(json!({ "message": "Experiment created", "id": id })))
}

pub async fn delete_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .delete_experiment(&experiment_id)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Experiment deleted" })))
}

pub async fn restore_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .restore_experiment(&experiment_id)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Experiment restored" })))
}

pub async fn update_experiment(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
    Query(query): Query<NewNameQuery>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .rename_experiment(&experiment_id, &query.new_name)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Experiment updated" })))
}

// ============================================================================
// Run Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct CreateRunQuery {
    experiment_id: String,
    #[serde(default)]
    run_name: String,
}

#[derive(Deserialize)]
pub struct MetricQuery {
    key: String,
    value: f64,
}

#[derive(Deserialize)]
pub struct ParamQuery {
    key: String,
    value: String,
}

#[derive(Deserialize)]
pub struct ArtifactListQuery {
    path: Option<String>,
}

#[derive(Deserialize)]
pub struct LogArtifactQuery {
    file_path: String,
    artifact_path: Option<String>,
}

pub async fn list_all_runs(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let runs = ops::list_all_runs(state.tracking())
        .await
        .map_err(ServerError::upstream)?;
    let runs: Vec<RunView> = runs.iter().map(RunView::from).collect();
    Ok(Json(json!({ "runs": runs })))
}

pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Path(experiment_id): Path<String>,
) -> Result<Json<Value>> {
    let runs = state
        .tracking()
        .search_runs(&[experiment_id], ViewType::ActiveOnly)
        .await
        .map_err(ServerError::upstream)?;
    let runs: Vec<RunView> = runs.iter().map(RunView::from).collect();
    Ok(Json(json!({ "runs": runs })))
}

pub async fn create_run(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CreateRunQuery>,
) -> Result<Json<Value>> {
    let run = ops::create_run(state.tracking(), &query.experiment_id, &query.run_name)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "run": RunView::from(&run) })))
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>> {
    let run = state
        .tracking()
        .get_run(&run_id)
        .await
        .map_err(ServerError::lookup)?;
    Ok(Json(json!({ "run": RunView::from(&run) })))
}

pub async fn delete_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .delete_run(&run_id)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Run deleted" })))
}

pub async fn restore_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .restore_run(&run_id)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Run restored" })))
}

pub async fn log_metric(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(query): Query<MetricQuery>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .log_metric(&run_id, &query.key, query.value)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({
        "message": format!("Metric {} logged with value {}", query.key, query.value),
    })))
}

pub async fn log_param(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(query): Query<ParamQuery>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .log_param(&run_id, &query.key, &query.value)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({
        "message": format!("Parameter {} logged with value {}", query.key, query.value),
    })))
}

pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(query): Query<ArtifactListQuery>,
) -> Result<Json<Value>> {
    let files = state
        .tracking()
        .list_artifacts(&run_id, query.path.as_deref())
        .await
        .map_err(ServerError::upstream)?;
    let paths: Vec<String> = files.into_iter().map(|f| f.path).collect();
    Ok(Json(json!({ "artifacts": paths })))
}

pub async fn log_artifact(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
    Query(query): Query<LogArtifactQuery>,
) -> Result<Json<Value>> {
    let local_file = PathBuf::from(&query.file_path);
    state
        .tracking()
        .log_artifact(&run_id, &local_file, query.artifact_path.as_deref())
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": format!("Artifact {} logged", query.file_path) })))
}

// ============================================================================
// Registered Model Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct CreateVersionQuery {
    #[serde(default)]
    run_id: String,
    #[serde(default)]
    source: String,
    /// Older dashboards send the run id under this name
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
pub struct StageQuery {
    stage: String,
}

#[derive(Deserialize)]
pub struct TagQuery {
    key: String,
    value: String,
}

pub async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let models = state
        .tracking()
        .search_registered_models()
        .await
        .map_err(ServerError::upstream)?;
    let models: Vec<RegisteredModelView> = models.iter().map(RegisteredModelView::from).collect();
    Ok(Json(json!({ "models": models })))
}

pub async fn create_model(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> Result<Json<RegisteredModelView>> {
    let model = ops::create_registered_model(state.tracking(), &query.name)
        .await
        .map_err(ServerError::upstream)?;
    info!(model = %model.name, "Registered model created");
    Ok(Json(RegisteredModelView::from(&model)))
}

pub async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    let model = state
        .tracking()
        .get_registered_model(&name)
        .await
        .map_err(ServerError::lookup)?;
    Ok(Json(json!({ "registered_model": RegisteredModelView::with_tags(&model) })))
}

pub async fn rename_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<NewNameQuery>,
) -> Result<Json<RegisteredModelView>> {
    let model = ops::rename_registered_model(state.tracking(), &name, &query.new_name)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(RegisteredModelView::with_tags(&model)))
}

pub async fn update_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<DescriptionQuery>,
) -> Result<Json<Value>> {
    let model = ops::update_registered_model(state.tracking(), &name, &query.description)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "registered_model": RegisteredModelView::with_tags(&model) })))
}

pub async fn delete_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .delete_registered_model(&name)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Model deleted" })))
}

pub async fn set_model_tag(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .set_registered_model_tag(&name, &query.key, &query.value)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Model tag set" })))
}

// ============================================================================
// Model Version Handlers
// ============================================================================

pub async fn create_model_version(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<CreateVersionQuery>,
) -> Result<Json<Value>> {
    let run_id = if query.run_id.is_empty() {
        query.version.as_str()
    } else {
        query.run_id.as_str()
    };
    if run_id.is_empty() && query.source.is_empty() {
        return Err(ServerError::BadRequest(
            "Either source or run_id is required".to_string(),
        ));
    }

    let mv = ops::create_model_version(state.tracking(), &name, &query.source, run_id)
        .await
        .map_err(ServerError::upstream)?;
    info!(model = %mv.name, version = %mv.version, "Model version created");
    Ok(Json(json!({ "model_version": ModelVersionView::from(&mv) })))
}

pub async fn update_model_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    Query(query): Query<DescriptionQuery>,
) -> Result<Json<Value>> {
    let mv = ops::update_model_version(state.tracking(), &name, &version, &query.description)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "model_version": ModelVersionView::from(&mv) })))
}

pub async fn delete_model_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<Value>> {
    state
        .tracking()
        .delete_model_version(&name, &version)
        .await
        .map_err(ServerError::upstream)?;
    Ok(Json(json!({ "message": "Model version deleted" })))
}

pub async fn get_model_version(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let mv = state
        .tracking()
        .get_model_version(&name, &version)
        .await
        .map_err(ServerError::lookup)?;
    Ok(Json(json!({ "model_version": ModelVersionView::with_tags(&mv) })))
}

pub async fn set_model_stage(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
    Query(query): Query<StageQuery>,
) -> Result<Json<Value>> {
    let stage: ModelStage = query
        .stage
        .parse()
        .map_err(|e: crate::tracking::TrackingError| ServerError::BadRequest(e.to_string()))?;
    let mv = state
        .tracking()
        .transition_model_version_stage(&name, &version, stage)
        .await
        .map_err(ServerError::upstream)?;
    info!(model = %name, version = %version, stage = %stage, "Model version stage changed");
    Ok(Json(json!({ "model_version": ModelVersionView::from(&mv) })))
}

// ============================================================================
// Deployment Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct CreateDeploymentQuery {
    name: String,
    model: String,
    version: String,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    status: String,
}

pub async fn list_deployments(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Deployment>>> {
    Ok(Json(state.deployments.list()?))
}

pub async fn get_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Deployment>> {
    Ok(Json(state.deployments.get(id)?))
}

pub async fn create_deployment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CreateDeploymentQuery>,
) -> Result<Json<Value>> {
    let created = state
        .deployments
        .create(&query.name, &query.model, &query.version)
        .await?;
    Ok(Json(json!({
        "message": "Deployment created",
        "id": created.id,
        "name": created.name,
        "model": created.model,
        "version": created.version,
        "port": created.port,
    })))
}

pub async fn update_deployment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>> {
    state.deployments.update_status(id, &query.status)?;
    Ok(Json(json!({
        "message": format!("Deployment {} updated to {}", id, query.status),
    })))
}

pub async fn delete_deployment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.deployments.delete(id).await?;
    Ok(Json(json!({ "message": format!("Deployment {} stopped and deleted", id) })))
}

pub async fn get_deployment_logs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let logs = state.deployments.logs(id).await?;
    Ok(Json(json!({ "deployment_id": id, "logs": logs })))
}
