use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;

pub const DEFAULT_TOKEN_EXPIRE_MINUTES: i64 = 1800;
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone)]
pub struct QuotaApiConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    /// Set when `JWT_SECRET` was missing and a per-process secret was generated.
    pub jwt_secret_generated: bool,
    pub access_token_expire_minutes: i64,
    pub bcrypt_cost: u32,
    pub seed_demo_data: bool,
    pub enable_debug_routes: bool,
    /// Empty means any origin is accepted.
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for QuotaApiConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            data_dir: PathBuf::from("data/quota"),
            jwt_secret: String::new(),
            jwt_secret_generated: false,
            access_token_expire_minutes: DEFAULT_TOKEN_EXPIRE_MINUTES,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            seed_demo_data: true,
            enable_debug_routes: false,
            cors_allowed_origins: Vec::new(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl QuotaApiConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("QUOTA_API_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("QUOTA_API_PORT") {
            cfg.server_port = port.parse().context("QUOTA_API_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => cfg.jwt_secret = secret,
            _ => {
                cfg.jwt_secret = generate_secret();
                cfg.jwt_secret_generated = true;
            }
        }
        if let Ok(minutes) = env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            cfg.access_token_expire_minutes = minutes
                .parse()
                .context("ACCESS_TOKEN_EXPIRE_MINUTES must be a positive integer")?;
        }
        if let Ok(cost) = env::var("BCRYPT_COST") {
            cfg.bcrypt_cost = cost.parse().context("BCRYPT_COST must be an integer")?;
        }
        if let Ok(flag) = env::var("SEED_DEMO_DATA") {
            cfg.seed_demo_data = parse_bool(&flag)
                .with_context(|| format!("SEED_DEMO_DATA is invalid: {flag}"))?;
        }
        if let Ok(flag) = env::var("ENABLE_DEBUG_ROUTES") {
            cfg.enable_debug_routes = parse_bool(&flag)
                .with_context(|| format!("ENABLE_DEBUG_ROUTES is invalid: {flag}"))?;
        }
        if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
            cfg.cors_allowed_origins = parse_list(&origins);
        }
        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = timeout
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must be provided or auto-generated");
        }
        if self.access_token_expire_minutes <= 0 {
            anyhow::bail!("ACCESS_TOKEN_EXPIRE_MINUTES must be greater than zero");
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        Ok(())
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => anyhow::bail!("invalid boolean value {value}"),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("YES").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("n").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn parse_list_drops_blank_entries() {
        assert_eq!(
            parse_list(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn validate_rejects_out_of_range_bcrypt_cost() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = QuotaApiConfig {
            data_dir: dir.path().to_path_buf(),
            jwt_secret: "secret".to_string(),
            bcrypt_cost: 2,
            ..QuotaApiConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_requires_secret() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = QuotaApiConfig {
            data_dir: dir.path().to_path_buf(),
            ..QuotaApiConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn from_env_reads_log_level_and_flags_generated_secret() {
        let dir = tempfile::tempdir().unwrap();
        env::set_var("QUOTA_DATA_DIR", dir.path());
        env::set_var("LOG_LEVEL", "debug");
        env::remove_var("JWT_SECRET");

        let cfg = QuotaApiConfig::from_env().unwrap();

        env::remove_var("QUOTA_DATA_DIR");
        env::remove_var("LOG_LEVEL");

        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.jwt_secret_generated);
        assert_eq!(cfg.jwt_secret.len(), 48);
    }

    #[test]
    fn generated_secrets_are_unique() {
        assert_ne!(generate_secret(), generate_secret());
        assert_eq!(generate_secret().len(), 48);
    }
}
