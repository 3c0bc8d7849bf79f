use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::DashboardError;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub usage: u64,
    pub soft: u64,
    pub hard: u64,
    pub files: u64,
}

/// Lab members in the order the API listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberMap {
    entries: Vec<(String, MemberStats)>,
}

impl MemberMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, stats: MemberStats) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = stats,
            None => self.entries.push((name, stats)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MemberStats> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, stats)| stats)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemberStats)> + '_ {
        self.entries.iter().map(|(name, stats)| (name, stats))
    }

    pub fn values(&self) -> impl Iterator<Item = &MemberStats> + '_ {
        self.entries.iter().map(|(_, stats)| stats)
    }
}

impl<'de> Deserialize<'de> for MemberMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MemberMapVisitor;

        impl<'de> Visitor<'de> for MemberMapVisitor {
            type Value = MemberMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of member name to usage")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MemberMap, A::Error> {
                let mut members = MemberMap::new();
                while let Some((name, stats)) = access.next_entry::<String, MemberStats>()? {
                    members.insert(name, stats);
                }
                Ok(members)
            }
        }

        deserializer.deserialize_map(MemberMapVisitor)
    }
}

pub type AdminQuotas = BTreeMap<String, MemberMap>;

#[derive(Debug, Clone, Deserialize)]
pub struct MembersResponse {
    #[serde(rename = "PI Name")]
    pub pi_name: String,
    #[serde(rename = "Users")]
    pub users: MemberMap,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the quota API.
#[derive(Clone)]
pub struct QuotaApiClient {
    http: Client,
    base_url: Url,
}

impl QuotaApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DashboardError::Config(err.to_string()))?;

        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, DashboardError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, DashboardError> {
        let url = self.url("token")?;
        debug!(%url, username, "requesting access token");

        let response = self
            .http
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        parse_json(response).await
    }

    pub async fn members(&self, token: &str) -> Result<MembersResponse, DashboardError> {
        self.get_json("api/v2/members/", token).await
    }

    pub async fn admin_quotas(&self, token: &str) -> Result<AdminQuotas, DashboardError> {
        self.get_json("api/v2/admin/quotas/", token).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, DashboardError> {
        let url = self.url(path)?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, DashboardError> {
    if !response.status().is_success() {
        return Err(map_api_error(response).await);
    }

    response.json::<T>().await.map_err(DashboardError::from)
}

async fn map_api_error(response: Response) -> DashboardError {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            } else {
                body
            }
        });

    warn!(%url, status = status.as_u16(), %message, "quota API returned an error");
    DashboardError::Api {
        status: status.as_u16(),
        message,
    }
}
