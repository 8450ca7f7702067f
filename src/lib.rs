//! MLflow Lifecycle - model lifecycle service over an MLflow tracking server
//!
//! # Modules
//!
//! - [`tracking`] - Tracking-service client (REST and in-memory backends)
//! - [`deploy`] - Serving-container deployments and their SQLite table
//! - [`server`] - HTTP server with REST API and dashboard
//! - [`cli`] - Command-line interface

pub mod tracking;
pub mod deploy;
pub mod server;
pub mod cli;

pub use server::{create_router, run_server, AppState, ServerConfig};
pub use tracking::{TrackingBackend, TrackingError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
