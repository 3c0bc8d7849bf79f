use std::sync::Arc;

use axum::{extract::State, Form, Json};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{authenticate, TOKEN_TYPE};
use crate::usage::{group_by_pi, group_members, UsageSummary};

use super::error::{bad_request, forbidden, internal_error, not_found, ApiError};
use super::extractor::CurrentUser;
use super::types::{
    AdminQuotasResponse, DebugUser, LoginForm, MembersResponse, SummaryHistoryEntry,
    TokenResponse, UserProfile,
};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// OAuth2 token endpoint; every successful login is written to the login history.
pub async fn issue_token(
    State(state): State<Arc<ApiState>>,
    Form(form): Form<LoginForm>,
) -> ApiResult<TokenResponse> {
    login(state, form, true).await
}

/// Same as [`issue_token`] without recording login history.
pub async fn api_login(
    State(state): State<Arc<ApiState>>,
    Form(form): Form<LoginForm>,
) -> ApiResult<TokenResponse> {
    login(state, form, false).await
}

async fn login(
    state: Arc<ApiState>,
    form: LoginForm,
    record_history: bool,
) -> ApiResult<TokenResponse> {
    if form.username.trim().is_empty() || form.password.is_empty() {
        return Err(bad_request(
            "invalid_credentials",
            "username and password are required",
        ));
    }

    // bcrypt verification is CPU bound.
    let database = Arc::clone(&state.database);
    let user = tokio::task::spawn_blocking(move || {
        authenticate(&database, &form.username, &form.password)
    })
    .await
    .map_err(internal_error)??;

    if record_history {
        state
            .database
            .record_login(&user.username, Utc::now())
            .map_err(internal_error)?;
    }

    let token = state.tokens.issue(&user.username)?;
    info!(
        username = %user.username,
        is_admin = user.is_admin,
        record_history,
        "issued access token"
    );

    Ok(Json(TokenResponse {
        access_token: token.access_token,
        token_type: TOKEN_TYPE.to_string(),
        username: user.username,
        email: user.email,
        is_admin: user.is_admin,
        expires_at: token.expires_at.to_rfc3339(),
    }))
}

pub async fn read_users_me(CurrentUser(user): CurrentUser) -> ApiResult<UserProfile> {
    Ok(Json(UserProfile::from(user)))
}

pub async fn list_members(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<MembersResponse> {
    let quotas = state
        .database
        .quotas_for_pi(&user.username)
        .map_err(internal_error)?;

    if quotas.is_empty() {
        return Err(not_found("pi_not_found", "No users found for this PI"));
    }

    Ok(Json(MembersResponse {
        pi_name: user.username,
        users: group_members(&quotas),
    }))
}

pub async fn get_summary(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<UsageSummary> {
    let quotas = state
        .database
        .quotas_for_pi(&user.username)
        .map_err(internal_error)?;

    let summary = UsageSummary::from_records(&user.username, &quotas).ok_or_else(|| {
        not_found("pi_not_found", "No quota records found for this PI")
    })?;

    state
        .database
        .record_summary(&summary, Utc::now())
        .map_err(internal_error)?;

    Ok(Json(summary))
}

/// Admins see every PI's history; other users only their own.
pub async fn get_summary_history(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<SummaryHistoryEntry>> {
    let scope = (!user.is_admin).then_some(user.username.as_str());
    let history = state
        .database
        .summary_history(scope)
        .map_err(internal_error)?;

    Ok(Json(
        history.into_iter().map(SummaryHistoryEntry::from).collect(),
    ))
}

pub async fn admin_quotas(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<AdminQuotasResponse> {
    if !user.is_admin {
        warn!(username = %user.username, "non-admin requested all quotas");
        return Err(forbidden("not_authorized", "Not authorized"));
    }

    let quotas = state.database.all_quotas().map_err(internal_error)?;
    Ok(Json(group_by_pi(&quotas)))
}

pub async fn debug_users(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<DebugUser>> {
    let users = state.database.list_users().map_err(internal_error)?;
    Ok(Json(
        users
            .into_iter()
            .map(|user| DebugUser {
                username: user.username,
                email: user.email,
            })
            .collect(),
    ))
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "quota-api"
    })))
}
