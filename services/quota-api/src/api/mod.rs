use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

pub mod error;
pub mod extractor;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use extractor::CurrentUser;
pub use router::create_router;
pub use types::*;

use crate::auth::TokenIssuer;
use crate::config::QuotaApiConfig;
use crate::storage::{seed_demo_data, QuotaDatabase};

pub struct ApiState {
    pub database: Arc<QuotaDatabase>,
    pub tokens: Arc<TokenIssuer>,
    pub config: Arc<QuotaApiConfig>,
}

impl ApiState {
    pub fn new(config: QuotaApiConfig) -> Result<Self> {
        let database = QuotaDatabase::new(&config.data_dir).with_context(|| {
            format!("failed to open quota database in {}", config.data_dir.display())
        })?;
        info!(path = %database.path().display(), "quota database ready");

        if config.seed_demo_data {
            seed_demo_data(&database, config.bcrypt_cost).context("failed to seed demo data")?;
        }

        let tokens = TokenIssuer::new(&config.jwt_secret, config.access_token_expire_minutes);

        Ok(Self {
            database: Arc::new(database),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        })
    }
}
