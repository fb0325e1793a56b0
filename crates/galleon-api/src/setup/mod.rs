//! Application setup and initialization
//!
//! Everything between a loaded `Config` and a ready-to-serve router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use galleon_core::Config;
use galleon_db::UserRepository;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(&config.environment)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let users = Arc::new(UserRepository::new(pool));

    let state = services::initialize_services(config, users).await?;
    let router = routes::setup_routes(state.clone()).await?;

    Ok((state, router))
}
