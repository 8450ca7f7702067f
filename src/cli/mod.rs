//! MLflow Lifecycle CLI Module
//!
//! Command-line interface for running the API server and inspecting the
//! tracking server and deployment table from a terminal.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use crate::deploy::DeploymentStore;
use crate::server::{run_server, ServerConfig};
use crate::tracking::{self, TrackingBackend, ViewType};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 190, 90) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Cut `s` to `width` characters, marking the cut with an ellipsis
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn stage_colored(stage: &str) -> ColoredString {
    match stage {
        "active" | "Production" | "FINISHED" | "Running" => ok(stage),
        "deleted" | "Archived" | "FAILED" | "KILLED" => warn(stage),
        _ => muted(stage),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mlflow-lifecycle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Model lifecycle service in front of an MLflow tracking server")]
#[command(long_about = None)]
pub struct Cli {
    /// Tracking server location (`memory://` for an offline demo registry)
    #[arg(long, global = true, env = "MLFLOW_TRACKING_URI")]
    pub tracking_uri: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server and dashboard
    Serve {
        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite file holding the deployments table
        #[arg(long)]
        database: Option<PathBuf>,

        /// Directory model artifacts are downloaded to
        #[arg(long)]
        deployment_dir: Option<PathBuf>,
    },

    /// List experiments
    Experiments,

    /// List the runs of one experiment
    Runs {
        /// Experiment ID
        experiment_id: String,
    },

    /// List registered models and their latest versions
    Models,

    /// List recorded deployments
    Deployments {
        /// SQLite file holding the deployments table
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

/// Environment defaults overridden by whatever flags were given
pub fn server_config(
    tracking_uri: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    database: Option<PathBuf>,
    deployment_dir: Option<PathBuf>,
) -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        tracking_uri: tracking_uri.unwrap_or(defaults.tracking_uri),
        host: host.unwrap_or(defaults.host),
        port: port.unwrap_or(defaults.port),
        database_path: database.unwrap_or(defaults.database_path),
        deployment_dir: deployment_dir.unwrap_or(defaults.deployment_dir),
        ..defaults
    }
}

fn connect(tracking_uri: Option<String>) -> anyhow::Result<Arc<dyn TrackingBackend>> {
    let config = server_config(tracking_uri, None, None, None, None);
    Ok(tracking::connect(&config.tracking_uri, config.request_timeout())?)
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    let base = format!("http://{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "MLflow Lifecycle".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Dashboard", &base));
    line_box(&kv("Health   ", &format!("{}/health", base)));
    line_box(&kv("Tracking ", &fit(&config.tracking_uri, 46)));
    line_box(&kv("Database ", &fit(&config.database_path.display().to_string(), 46)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

// ─── Listings ──────────────────────────────────────────────────────────────────

pub async fn cmd_experiments(tracking_uri: Option<String>) -> anyhow::Result<()> {
    let backend = connect(tracking_uri)?;
    let experiments = backend.search_experiments(ViewType::All).await?;

    section(&format!("Experiments {}", dim(backend.tracking_uri())));
    println!("  {:<8} {:<36} {}", muted("ID"), muted("Name"), muted("Stage"));
    for e in &experiments {
        println!(
            "  {:<8} {:<36} {}",
            fit(&e.experiment_id, 8),
            fit(&e.name, 36),
            stage_colored(&e.lifecycle_stage)
        );
    }
    println!();
    println!("  {}", dim(&format!("{} experiment(s)", experiments.len())));
    println!();
    Ok(())
}

pub async fn cmd_runs(tracking_uri: Option<String>, experiment_id: &str) -> anyhow::Result<()> {
    let backend = connect(tracking_uri)?;
    let runs = backend
        .search_runs(&[experiment_id.to_string()], ViewType::ActiveOnly)
        .await?;

    section(&format!("Runs of experiment {}", experiment_id));
    println!("  {:<32} {:<16} {:<10} {}", muted("Run ID"), muted("Name"), muted("Status"), muted("Metrics"));
    for run in &runs {
        let metrics = run
            .data
            .metrics
            .iter()
            .map(|m| format!("{}={}", m.key, m.value))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<32} {:<16} {:<10} {}",
            fit(&run.info.run_id, 32),
            fit(run.info.run_name.as_deref().unwrap_or("-"), 16),
            stage_colored(run.info.status.as_str()),
            fit(&metrics, 40)
        );
    }
    println!();
    println!("  {}", dim(&format!("{} run(s)", runs.len())));
    println!();
    Ok(())
}

pub async fn cmd_models(tracking_uri: Option<String>) -> anyhow::Result<()> {
    let backend = connect(tracking_uri)?;
    let models = backend.search_registered_models().await?;

    section("Registered models");
    for model in &models {
        println!("  {}", model.name.white().bold());
        if let Some(description) = model.description.as_deref().filter(|d| !d.is_empty()) {
            println!("    {}", muted(description));
        }
        if model.latest_versions.is_empty() {
            println!("    {}", dim("no versions"));
        }
        for v in &model.latest_versions {
            println!(
                "    {} {:<6} {}",
                dim("v"),
                v.version,
                stage_colored(v.current_stage.as_deref().unwrap_or("None"))
            );
        }
    }
    println!();
    println!("  {}", dim(&format!("{} model(s)", models.len())));
    println!();
    Ok(())
}

pub fn cmd_deployments(database: Option<PathBuf>) -> anyhow::Result<()> {
    let config = server_config(None, None, None, database, None);
    let store = DeploymentStore::open(&config.database_path)?;
    let deployments = store.list()?;

    section(&format!("Deployments {}", dim(&config.database_path.display().to_string())));
    println!(
        "  {:<5} {:<16} {:<16} {:<8} {:<10} {}",
        muted("ID"), muted("Name"), muted("Model"), muted("Version"), muted("Status"), muted("Updated")
    );
    for d in &deployments {
        println!(
            "  {:<5} {:<16} {:<16} {:<8} {:<10} {}",
            d.id,
            fit(&d.name, 16),
            fit(&d.model, 16),
            fit(&d.version, 8),
            stage_colored(&d.status),
            dim(&d.last_updated)
        );
    }
    println!();
    println!("  {}", dim(&format!("{} deployment(s)", deployments.len())));
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["mlflow-lifecycle"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_global_tracking_uri_after_subcommand() {
        let cli = Cli::try_parse_from(["mlflow-lifecycle", "runs", "3", "--tracking-uri", "memory://"]).unwrap();
        assert_eq!(cli.tracking_uri.as_deref(), Some("memory://"));
        match cli.command {
            Some(Commands::Runs { experiment_id }) => assert_eq!(experiment_id, "3"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_flags_override_defaults() {
        let config = server_config(
            Some("memory://".to_string()),
            Some("0.0.0.0".to_string()),
            Some(9100),
            Some(PathBuf::from("/tmp/d.db")),
            None,
        );
        assert_eq!(config.tracking_uri, "memory://");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.database_path, PathBuf::from("/tmp/d.db"));
        assert_eq!(config.deployment_dir, ServerConfig::default().deployment_dir);
    }

    #[test]
    fn test_fit_truncates_with_ellipsis() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_strip_ansi() {
        let styled = format!("{}", "x".red());
        assert_eq!(strip_ansi(&styled), "x");
    }
}
