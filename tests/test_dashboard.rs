//! Integration test: embedded dashboard structure

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mlflow_lifecycle::deploy::{ContainerRuntime, DeploymentStore, DockerCli};
use mlflow_lifecycle::server::{create_router, AppState, ServerConfig};
use mlflow_lifecycle::tracking::InMemoryTracking;
use tempfile::TempDir;
use tower::ServiceExt;

async fn get_html(uri: &str) -> String {
    let scratch = TempDir::new().unwrap();
    let config = ServerConfig {
        tracking_uri: "memory://".to_string(),
        deployment_dir: scratch.path().join("deployments"),
        ..ServerConfig::default()
    };
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::default());
    let state = AppState::with_components(
        config,
        Arc::new(InMemoryTracking::new()),
        runtime,
        DeploymentStore::open_in_memory().unwrap(),
    )
    .unwrap();
    let app = create_router(Arc::new(state));

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"), "{}", content_type);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_dashboard_served_at_root_and_dashboard() {
    let root = get_html("/").await;
    let dashboard = get_html("/dashboard").await;
    assert_eq!(root, dashboard);
    assert!(root.contains("<title>MLflow Lifecycle</title>"));
}

#[tokio::test]
async fn test_dashboard_has_six_tabs() {
    let html = get_html("/").await;
    for tab in ["experiments", "runs", "models", "versions", "stages", "deployments"] {
        assert!(html.contains(&format!("data-tab=\"{}\"", tab)), "Missing tab: {}", tab);
        assert!(html.contains(&format!("tab==='{}'", tab)), "Missing panel: {}", tab);
    }
}

#[tokio::test]
async fn test_dashboard_calls_api_routes() {
    let html = get_html("/").await;
    for route in [
        "/experiments/create?",
        "/experiments/restore/",
        "/runs/create?",
        "/log_metric?",
        "/log_param?",
        "/models/create?",
        "/models/rename/",
        "/models/delete/",
        "/models/version/create/",
        "/models/version/delete/",
        "/models/set_stage/",
        "/deployments/create?",
        "/logs'",
    ] {
        assert!(html.contains(route), "Dashboard never calls {}", route);
    }
}
