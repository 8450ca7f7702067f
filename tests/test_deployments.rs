//! Integration test: deployment routes with a recording container runtime

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use mlflow_lifecycle::deploy::{ContainerRuntime, ContainerSpec, DeploymentStore, RuntimeError};
use mlflow_lifecycle::server::{create_router, AppState, ServerConfig};
use mlflow_lifecycle::tracking::{ops, InMemoryTracking, TrackingBackend};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingRuntime {
    started: Mutex<Vec<ContainerSpec>>,
    stopped: Mutex<Vec<String>>,
    fail_start: bool,
    fail_stop: bool,
}

fn failure(command: &str) -> RuntimeError {
    RuntimeError::Failed {
        command: command.to_string(),
        code: 125,
        stderr: "daemon unavailable".to_string(),
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn run(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        if self.fail_start {
            return Err(failure("docker run"));
        }
        self.started.lock().push(spec.clone());
        Ok(format!("cid-{}", spec.name))
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        if self.fail_stop {
            return Err(failure("docker stop"));
        }
        self.stopped.lock().push(name.to_string());
        Ok(())
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError> {
        Ok(format!("serving {}\ntail {}", name, tail))
    }
}

struct Harness {
    app: Router,
    runtime: Arc<RecordingRuntime>,
    scratch: TempDir,
}

/// Router over a registry holding model `clf` version 1, produced by a run
/// that logged one artifact
async fn harness(runtime: RecordingRuntime) -> Harness {
    let scratch = TempDir::new().unwrap();
    let tracking = Arc::new(InMemoryTracking::new());

    let run = ops::create_run(tracking.as_ref(), "0", "train").await.unwrap();
    let weights = scratch.path().join("weights.bin");
    std::fs::write(&weights, b"0101").unwrap();
    tracking
        .log_artifact(&run.info.run_id, &weights, Some("model"))
        .await
        .unwrap();
    tracking.create_registered_model("clf").await.unwrap();
    ops::create_model_version(tracking.as_ref(), "clf", "", &run.info.run_id)
        .await
        .unwrap();

    let config = ServerConfig {
        tracking_uri: "memory://".to_string(),
        deployment_dir: scratch.path().join("deployments"),
        serving_image: "serve:test".to_string(),
        serving_port: 6100,
        ..ServerConfig::default()
    };
    let runtime = Arc::new(runtime);
    let state = AppState::with_components(
        config,
        tracking,
        Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
        DeploymentStore::open_in_memory().unwrap(),
    )
    .unwrap();

    Harness {
        app: create_router(Arc::new(state)),
        runtime,
        scratch,
    }
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_create_deployment_starts_container_and_records_row() {
    let h = harness(RecordingRuntime::default()).await;

    let (status, json) = call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["message"], "Deployment created");
    assert_eq!(json["id"], 1);
    assert_eq!(json["name"], "prod");
    assert_eq!(json["model"], "clf");
    assert_eq!(json["version"], "1");
    assert_eq!(json["port"], 6100);

    let started = h.runtime.started.lock().clone();
    assert_eq!(started.len(), 1);
    let spec = &started[0];
    assert_eq!(spec.name, "deployment_clf_1");
    assert_eq!(spec.image, "serve:test");
    let args = spec.run_args();
    assert!(args.windows(2).any(|w| w[0] == "-p" && w[1] == "6100:5001"));
    assert_eq!(&args[args.len() - 2..], ["--model-uri", "/model"]);

    let model_dir = h.scratch.path().join("deployments").join("clf_1");
    assert!(spec.model_dir.is_absolute());
    assert_eq!(
        std::fs::read(model_dir.join("model").join("weights.bin")).unwrap(),
        b"0101"
    );

    let (status, json) = call(&h.app, Method::GET, "/deployments/").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "Running");
    assert!(rows[0]["last_updated"].is_string());
}

#[tokio::test]
async fn test_unknown_version_is_rejected() {
    let h = harness(RecordingRuntime::default()).await;
    let (status, json) = call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=9").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid model version");
    assert!(h.runtime.started.lock().is_empty());
}

#[tokio::test]
async fn test_failed_start_records_nothing() {
    let h = harness(RecordingRuntime {
        fail_start: true,
        ..RecordingRuntime::default()
    })
    .await;
    let (status, json) = call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to start deployment"));

    let (_, json) = call(&h.app, Method::GET, "/deployments").await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_get_and_update_status() {
    let h = harness(RecordingRuntime::default()).await;
    call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;

    let (status, json) = call(&h.app, Method::PUT, "/deployments/1/update_status?status=Paused").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Deployment 1 updated to Paused");

    let (status, json) = call(&h.app, Method::GET, "/deployments/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Paused");
    assert_eq!(json["name"], "prod");
}

#[tokio::test]
async fn test_missing_deployment_is_404() {
    let h = harness(RecordingRuntime::default()).await;
    for (method, uri) in [
        (Method::GET, "/deployments/42"),
        (Method::PUT, "/deployments/42/update_status?status=Stopped"),
        (Method::DELETE, "/deployments/42"),
        (Method::GET, "/deployments/42/logs"),
    ] {
        let (status, json) = call(&h.app, method, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["message"], "Deployment not found");
    }
}

#[tokio::test]
async fn test_logs_are_split_into_lines() {
    let h = harness(RecordingRuntime::default()).await;
    call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;

    let (status, json) = call(&h.app, Method::GET, "/deployments/1/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deployment_id"], 1);
    assert_eq!(
        json["logs"],
        serde_json::json!(["serving deployment_clf_1", "tail 50"])
    );
}

#[tokio::test]
async fn test_delete_stops_container_then_removes_row() {
    let h = harness(RecordingRuntime::default()).await;
    call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;

    let (status, json) = call(&h.app, Method::DELETE, "/deployments/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Deployment 1 stopped and deleted");
    assert_eq!(h.runtime.stopped.lock().as_slice(), ["deployment_clf_1"]);

    let (status, _) = call(&h.app, Method::GET, "/deployments/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_stop_keeps_row() {
    let h = harness(RecordingRuntime {
        fail_stop: true,
        ..RecordingRuntime::default()
    })
    .await;
    call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;

    let (status, json) = call(&h.app, Method::DELETE, "/deployments/1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["message"], "Failed to stop deployment container");

    let (status, _) = call(&h.app, Method::GET, "/deployments/1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_redeploy_replaces_previous_artifacts() {
    let h = harness(RecordingRuntime::default()).await;
    call(&h.app, Method::POST, "/deployments/create?name=prod&model=clf&version=1").await;

    let model_dir = h.scratch.path().join("deployments").join("clf_1");
    std::fs::write(model_dir.join("stale.pkl"), b"old").unwrap();

    let (status, json) = call(&h.app, Method::POST, "/deployments/create?name=prod-2&model=clf&version=1").await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert!(!model_dir.join("stale.pkl").exists());
    assert!(model_dir.join("model").join("weights.bin").exists());
    assert_eq!(h.runtime.started.lock().len(), 2);
}
