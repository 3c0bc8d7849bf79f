//! In-process harness that runs the quota API and the dashboard together on
//! ephemeral ports for end-to-end tests.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use axum::Router;
use lab_quota_api::QuotaApiConfig;
use lab_quota_dashboard::DashboardConfig;
use reqwest::Client;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Demo accounts seeded into every harness database.
pub const DEMO_PI: (&str, &str) = ("amy", "password123");
pub const DEMO_SECOND_PI: (&str, &str) = ("bob", "securepass");
pub const DEMO_ADMIN: (&str, &str) = ("admin", "adminpass");

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

struct ServiceHandle {
    name: &'static str,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

pub struct TestHarness {
    data_dir: TempDir,
    services: Vec<ServiceHandle>,
    http_client: Client,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        let data_dir = TempDir::new().context("creating harness data dir")?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;

        Ok(Self {
            data_dir,
            services: Vec::new(),
            http_client,
        })
    }

    /// Starts the quota API, then a dashboard pointed at it.
    pub async fn start_all_services(&mut self) -> Result<()> {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        let api_config = QuotaApiConfig {
            data_dir: self.data_dir.path().join("quota-api"),
            jwt_secret: "e2e-secret".to_string(),
            bcrypt_cost: 4,
            ..QuotaApiConfig::default()
        };
        api_config.validate()?;
        let api_router = lab_quota_api::build_router(api_config)?;
        self.spawn_service("quota-api", api_router).await?;

        let dashboard_config = DashboardConfig {
            api_base_url: self.api_url(""),
            request_timeout_secs: 5,
            ..DashboardConfig::default()
        };
        dashboard_config.validate()?;
        let dashboard_router = lab_quota_dashboard::build_router(dashboard_config)?;
        self.spawn_service("dashboard", dashboard_router).await?;

        Ok(())
    }

    async fn spawn_service(&mut self, name: &'static str, router: Router) -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .with_context(|| format!("binding {name} listener"))?;
        let addr = listener.local_addr()?;
        info!(service = name, %addr, "starting service");

        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router.into_make_service()).await {
                error!(service = name, error = %err, "service stopped with error");
            }
        });
        self.services.push(ServiceHandle { name, addr, task });

        let health_url = format!("http://{addr}/health");
        self.wait_for_service_health(&health_url, HEALTH_TIMEOUT)
            .await
            .with_context(|| format!("waiting for {name} health"))
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn api_url(&self, path: &str) -> String {
        self.service_url("quota-api", path)
    }

    pub fn dashboard_url(&self, path: &str) -> String {
        self.service_url("dashboard", path)
    }

    fn service_url(&self, name: &str, path: &str) -> String {
        self.services
            .iter()
            .find(|service| service.name == name)
            .map(|service| format!("http://{}{}", service.addr, path))
            .unwrap_or_default()
    }

    pub async fn wait_for_service_health(&self, url: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match self.http_client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    debug!("health check for {url} returned {}", response.status());
                }
                Err(err) => {
                    debug!("health check for {url} failed: {err}");
                }
            };
            sleep(Duration::from_millis(100)).await;
        }
        Err(anyhow!("timeout waiting for service health at {url}"))
    }

    /// Obtains a bearer token straight from the quota API.
    pub async fn api_token(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .http_client
            .post(self.api_url("/token"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("logging in as {username}"))?;
        let body: serde_json::Value = response.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("token response has no access_token"))
    }

    pub fn stop_all_services(&mut self) {
        for service in self.services.drain(..) {
            info!(service = service.name, "stopping service");
            service.task.abort();
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.stop_all_services();
    }
}
