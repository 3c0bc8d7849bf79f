pub mod api;
pub mod auth;
pub mod config;
pub mod storage;
pub mod usage;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;

pub use api::{create_router, ApiState};
pub use config::QuotaApiConfig;
pub use usage::{MemberUsage, UsageSummary};

/// Opens the database (seeding it when configured) and wires the HTTP routes.
pub fn build_router(config: QuotaApiConfig) -> Result<Router> {
    let state = Arc::new(ApiState::new(config)?);
    Ok(create_router(state))
}
