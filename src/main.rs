//! MLflow Lifecycle - Main Entry Point
//!
//! Runs the lifecycle API server (the default) or one of the listing commands.

use clap::Parser;
use mlflow_lifecycle::cli::{
    cmd_deployments, cmd_experiments, cmd_models, cmd_runs, cmd_serve, server_config, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlflow_lifecycle=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let tracking_uri = cli.tracking_uri;

    match cli.command {
        Some(Commands::Serve { host, port, database, deployment_dir }) => {
            cmd_serve(server_config(tracking_uri, host, port, database, deployment_dir)).await?;
        }
        Some(Commands::Experiments) => {
            cmd_experiments(tracking_uri).await?;
        }
        Some(Commands::Runs { experiment_id }) => {
            cmd_runs(tracking_uri, &experiment_id).await?;
        }
        Some(Commands::Models) => {
            cmd_models(tracking_uri).await?;
        }
        Some(Commands::Deployments { database }) => {
            cmd_deployments(database)?;
        }
        None => {
            cmd_serve(server_config(tracking_uri, None, None, None, None)).await?;
        }
    }

    Ok(())
}
