//! Application setup and initialization
//!
//! All application initialization logic, extracted from main.rs for better
//! organization and testability.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use carbonledger_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    // Setup database
    let pool = database::setup_database(&config).await?;

    // Initialize all services and repositories
    let state = services::initialize_services(&config, pool)?;

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Initialize basic tracing for the process.
pub fn init_telemetry() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carbonledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
