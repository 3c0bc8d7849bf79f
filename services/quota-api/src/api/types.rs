use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::{SummaryRecord, UserRecord};
use crate::usage::MemberMap;

/// OAuth2 password-flow form; extra fields such as `grant_type` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: Option<String>,
    pub disabled: bool,
    pub is_admin: bool,
    pub last_login: Option<String>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            username: user.username,
            email: Some(user.email),
            disabled: user.disabled,
            is_admin: user.is_admin,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersResponse {
    #[serde(rename = "PI Name")]
    pub pi_name: String,
    #[serde(rename = "Users")]
    pub users: MemberMap,
}

pub type AdminQuotasResponse = BTreeMap<String, MemberMap>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryHistoryEntry {
    #[serde(rename = "PI")]
    pub pi: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Number of Users")]
    pub number_of_users: u64,
    #[serde(rename = "Total Usage")]
    pub total_usage: u64,
    #[serde(rename = "Usage Average")]
    pub usage_average: f64,
    #[serde(rename = "Max Individual Usage")]
    pub max_individual_usage: u64,
}

impl From<SummaryRecord> for SummaryHistoryEntry {
    fn from(record: SummaryRecord) -> Self {
        Self {
            pi: record.pi_name,
            timestamp: record.timestamp,
            number_of_users: record.number_of_users,
            total_usage: record.total_usage,
            usage_average: record.usage_average,
            max_individual_usage: record.max_individual_usage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugUser {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}
