//! Wardkeep API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use tracing::info;
use wardkeep_core::AppError;

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url) => Some(api_services::connect_and_migrate(database_url).await?),
        None => None,
    };

    if config.migrate_only {
        info!("database migrations applied");
        return Ok(());
    }

    let app_state = api_services::build_app_state(pool, &config)?;

    if config.seed_default_catalog {
        api_services::seed_default_catalog(&app_state).await?;
    }

    if let Some(admin_id) = config.bootstrap_admin_id {
        api_services::ensure_bootstrap_admin(&app_state, admin_id).await?;
    }

    let app = api_router::build_router(app_state, config.cors_allowed_origin.as_deref())?;
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "wardkeep-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
