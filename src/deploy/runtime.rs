//! Container runtime invocation
//!
//! The deployment manager only needs three things from a runtime: start a
//! detached serving container, stop it, and read its recent log lines.
//! [`DockerCli`] does this by running the `docker` binary (or any
//! CLI-compatible one such as `podman`) with an argument vector.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::error::RuntimeError;

/// Everything needed to start one serving container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub host_port: u16,
    pub container_port: u16,
    /// Host directory holding the model, mounted at [`ContainerSpec::MODEL_MOUNT`]
    pub model_dir: PathBuf,
}

impl ContainerSpec {
    pub const MODEL_MOUNT: &'static str = "/model";

    /// Arguments of the `run` invocation, without the program name
    pub fn run_args(&self) -> Vec<String> {
        vec![
            "run".to_string(),
            "-d".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            self.name.clone(),
            "-p".to_string(),
            format!("{}:{}", self.host_port, self.container_port),
            "-v".to_string(),
            format!("{}:{}", self.model_dir.display(), Self::MODEL_MOUNT),
            self.image.clone(),
            "--model-uri".to_string(),
            Self::MODEL_MOUNT.to_string(),
        ]
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a detached container, returning the runtime's container id
    async fn run(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Last `tail` lines of the container's output
    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError>;
}

/// Runtime driven through the docker command line
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn invoke(&self, args: &[String]) -> Result<String, RuntimeError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command, "Invoking container runtime");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Failed {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // `docker logs` replays the container's stderr on our stderr
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn run(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let out = self.invoke(&spec.run_args()).await?;
        let container_id = out.lines().next().unwrap_or_default().trim().to_string();
        info!(container = %spec.name, container_id = %container_id, image = %spec.image, "Container started");
        Ok(container_id)
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.invoke(&["stop".to_string(), name.to_string()]).await?;
        info!(container = %name, "Container stopped");
        Ok(())
    }

    async fn logs(&self, name: &str, tail: usize) -> Result<String, RuntimeError> {
        self.invoke(&[
            "logs".to_string(),
            name.to_string(),
            "--tail".to_string(),
            tail.to_string(),
        ])
        .await
    }
}

/// Container name for a model version: `deployment_<model>_<version>`,
/// restricted to the characters container runtimes accept in names
pub fn container_name(model: &str, version: &str) -> String {
    let raw = format!("deployment_{}_{}", model, version);
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_sanitizes() {
        assert_eq!(container_name("churn", "3"), "deployment_churn_3");
        assert_eq!(container_name("team/fraud model", "1"), "deployment_team_fraud_model_1");
    }

    #[test]
    fn test_run_args() {
        let spec = ContainerSpec {
            name: "deployment_churn_3".to_string(),
            image: "serving:latest".to_string(),
            host_port: 5001,
            container_port: 5001,
            model_dir: PathBuf::from("/srv/deployments/churn_3"),
        };
        assert_eq!(
            spec.run_args().join(" "),
            "run -d --rm --name deployment_churn_3 -p 5001:5001 -v /srv/deployments/churn_3:/model serving:latest --model-uri /model"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_error() {
        let runtime = DockerCli::new("definitely-not-a-container-runtime");
        let err = runtime.stop("x").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }
}
