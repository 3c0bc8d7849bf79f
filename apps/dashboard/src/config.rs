use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::chart::DEFAULT_WARNING_THRESHOLD;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Dashboard sessions are forgotten after this long.
    pub session_ttl_minutes: u64,
    /// Percent of the soft limit at which a bar turns red.
    pub warning_threshold_percent: f64,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8050,
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 10,
            session_ttl_minutes: 1800,
            warning_threshold_percent: DEFAULT_WARNING_THRESHOLD,
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("DASHBOARD_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("DASHBOARD_PORT") {
            cfg.server_port = port.parse().context("DASHBOARD_PORT must be a valid u16")?;
        }
        if let Ok(url) = env::var("QUOTA_API_URL") {
            cfg.api_base_url = url;
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = timeout
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?;
        }
        if let Ok(minutes) = env::var("SESSION_TTL_MINUTES") {
            cfg.session_ttl_minutes = minutes
                .parse()
                .context("SESSION_TTL_MINUTES must be a positive integer")?;
        }
        if let Ok(threshold) = env::var("WARNING_THRESHOLD_PERCENT") {
            cfg.warning_threshold_percent = threshold
                .parse()
                .context("WARNING_THRESHOLD_PERCENT must be a number")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_base_url)
            .with_context(|| format!("QUOTA_API_URL is not a valid URL: {}", self.api_base_url))?;

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if self.session_ttl_minutes == 0 {
            anyhow::bail!("SESSION_TTL_MINUTES must be greater than zero");
        }
        if !self.warning_threshold_percent.is_finite() || self.warning_threshold_percent <= 0.0 {
            anyhow::bail!("WARNING_THRESHOLD_PERCENT must be a positive number");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes.saturating_mul(60))
    }
}
