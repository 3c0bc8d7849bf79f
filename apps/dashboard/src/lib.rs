pub mod chart;
pub mod client;
pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

pub use client::QuotaApiClient;
pub use config::DashboardConfig;
pub use error::DashboardError;
pub use routes::{create_router, DashboardState};

pub fn build_router(config: DashboardConfig) -> Result<Router> {
    let state = DashboardState::new(config).context("failed to create quota API client")?;
    Ok(create_router(Arc::new(state)))
}
