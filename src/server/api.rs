//! API route definitions

use std::sync::Arc;
use axum::{
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{handlers, state::AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. Visit / for the dashboard or /health to check API status.",
        })),
    )
}

async fn handle_405() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({
            "error": true,
            "message": "Method not allowed. Check the API documentation for supported methods.",
        })),
    )
}

fn experiment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/experiments", get(handlers::list_experiments))
        .route("/experiments/", get(handlers::list_experiments))
        .route("/experiments/create", post(handlers::create_experiment))
        .route("/experiments/by_name/:name", get(handlers::get_experiment_by_name))
        .route("/experiments/restore/:experiment_id", post(handlers::restore_experiment))
        .route(
            "/experiments/:experiment_id",
            get(handlers::get_experiment)
                .put(handlers::update_experiment)
                .delete(handlers::delete_experiment),
        )
}

// `/runs/:id` is the experiment id on GET and the run id on DELETE
fn run_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/runs", get(handlers::list_all_runs))
        .route("/runs/", get(handlers::list_all_runs))
        .route("/runs/create", post(handlers::create_run))
        .route("/runs/run/:run_id", get(handlers::get_run))
        .route("/runs/restore/:run_id", post(handlers::restore_run))
        .route("/runs/artifacts/:run_id", get(handlers::list_artifacts))
        .route("/runs/:id", get(handlers::list_runs).delete(handlers::delete_run))
        .route("/runs/:id/log_metric", post(handlers::log_metric))
        .route("/runs/:id/log_param", post(handlers::log_param))
        .route("/runs/:id/log_artifact", post(handlers::log_artifact))
}

fn model_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(handlers::list_models))
        .route("/models/", get(handlers::list_models))
        .route("/models/create", post(handlers::create_model))
        .route("/models/rename/:name", put(handlers::rename_model))
        .route("/models/delete/:name", axum::routing::delete(handlers::delete_model))
        .route("/models/set_stage/:name/:version", post(handlers::set_model_stage))
        // Model versions
        .route("/models/version/create/:name", post(handlers::create_model_version))
        .route("/models/version/update/:name/:version", post(handlers::update_model_version))
        .route(
            "/models/version/delete/:name/:version",
            axum::routing::delete(handlers::delete_model_version),
        )
        .route("/models/version/:name/:version", get(handlers::get_model_version))
        .route("/models/:name", get(handlers::get_model).put(handlers::update_model))
        .route("/models/:name/set_tag", post(handlers::set_model_tag))
}

fn deployment_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deployments", get(handlers::list_deployments))
        .route("/deployments/", get(handlers::list_deployments))
        .route("/deployments/create", post(handlers::create_deployment))
        .route(
            "/deployments/:id",
            get(handlers::get_deployment).delete(handlers::delete_deployment),
        )
        .route("/deployments/:id/update_status", put(handlers::update_deployment_status))
        .route("/deployments/:id/logs", get(handlers::get_deployment_logs))
}

fn cors_layer() -> CorsLayer {
    match std::env::var("CORS_ORIGIN") {
        Ok(origin) if !origin.is_empty() && origin != "*" => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS_ORIGIN");
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        },
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/", get(handlers::serve_dashboard))
        .route("/dashboard", get(handlers::serve_dashboard))
        .route("/health", get(handlers::health_check))
        .merge(experiment_routes())
        .merge(run_routes())
        .merge(model_routes())
        .merge(deployment_routes())
        .fallback(handle_404)
        .method_not_allowed_fallback(handle_405)
        .with_state(state);

    app.layer(CompressionLayer::new())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}
