use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::chart::{admin_view, member_view, ChartContent, NOT_LOGGED_IN, NO_USAGE_DATA};
use crate::client::QuotaApiClient;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::session::{clear_session_cookie, session_cookie, session_id, Session, SessionStore};
use crate::views::{render_page, PageModel};

pub const MISSING_CREDENTIALS: &str = "Please enter both username and password.";
pub const LOGGED_OUT: &str = "You have been logged out.";
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

pub struct DashboardState {
    pub client: QuotaApiClient,
    pub sessions: SessionStore,
    pub config: DashboardConfig,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        let client = QuotaApiClient::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self {
            client,
            sessions: SessionStore::new(config.session_ttl()),
            config,
        })
    }
}

pub fn create_router(state: Arc<DashboardState>) -> Router {
    // Outlasts the backend client timeout.
    let timeout = Duration::from_secs(state.config.request_timeout_secs.saturating_mul(2));

    Router::new()
        .route("/", get(index))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// PI selection parsed from the page query string.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub pis: Vec<String>,
    pub all: bool,
}

impl Selection {
    pub fn parse(query: Option<&str>) -> Self {
        let mut selection = Selection::default();
        let Some(query) = query else {
            return selection;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "pi" if !value.is_empty() => {
                    if !selection.pis.iter().any(|pi| pi.as_str() == &*value) {
                        selection.pis.push(value.into_owned());
                    }
                }
                "all" => selection.all = value == "1",
                _ => {}
            }
        }
        selection
    }

    /// Known PIs to chart; unknown names are dropped.
    pub fn resolve(&self, options: &[String]) -> Vec<String> {
        if self.all {
            return options.to_vec();
        }
        self.pis
            .iter()
            .filter(|pi| options.contains(pi))
            .cloned()
            .collect()
    }
}

async fn index(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let selection = Selection::parse(query.as_deref());

    let Some((id, session)) = current_session(&state, &headers) else {
        return page(
            PageModel {
                content: Some(ChartContent::message(NOT_LOGGED_IN)),
                ..PageModel::default()
            },
            None,
        );
    };

    let status = format!("Logged in as {}", session.username);
    render_session(&state, &id, session, status, &selection).await
}

async fn login(
    State(state): State<Arc<DashboardState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.username.is_empty() || form.password.is_empty() {
        return page(
            PageModel {
                status: Some(MISSING_CREDENTIALS.to_string()),
                content: Some(ChartContent::message(NOT_LOGGED_IN)),
                ..PageModel::default()
            },
            None,
        );
    }

    let token = match state.client.login(&form.username, &form.password).await {
        Ok(token) => token,
        Err(err) => {
            warn!(username = %form.username, error = %err, "dashboard login failed");
            return page(
                PageModel {
                    status: Some(format!("Login failed: {}", err.user_message())),
                    content: Some(ChartContent::message(NOT_LOGGED_IN)),
                    ..PageModel::default()
                },
                None,
            );
        }
    };

    if let Some(previous) = session_id(&headers) {
        state.sessions.remove(&previous);
    }

    let session = Session {
        token: token.access_token,
        username: token.username,
        is_admin: token.is_admin,
    };
    let id = state.sessions.create(session.clone());
    info!(username = %session.username, is_admin = session.is_admin, "dashboard session started");

    let status = format!("Logged in as {}", session.username);
    let mut response = render_session(&state, &id, session, status, &Selection::default()).await;
    if !response.headers().contains_key(header::SET_COOKIE) {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, session_cookie(&id));
    }
    response
}

async fn logout(State(state): State<Arc<DashboardState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if let Some(session) = state.sessions.remove(&id) {
            info!(username = %session.username, "dashboard session ended");
        }
    }

    page(
        PageModel {
            status: Some(LOGGED_OUT.to_string()),
            ..PageModel::default()
        },
        Some(clear_session_cookie()),
    )
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "dashboard"
    }))
}

fn current_session(state: &DashboardState, headers: &HeaderMap) -> Option<(String, Session)> {
    let id = session_id(headers)?;
    let session = state.sessions.get(&id)?;
    Some((id, session))
}

async fn render_session(
    state: &DashboardState,
    id: &str,
    session: Session,
    status: String,
    selection: &Selection,
) -> Response {
    let threshold = state.config.warning_threshold_percent;
    let mut model = PageModel {
        status: Some(status),
        username: Some(session.username.clone()),
        is_admin: session.is_admin,
        ..PageModel::default()
    };

    let loaded = if session.is_admin {
        state.client.admin_quotas(&session.token).await.map(|quotas| {
            model.pi_options = quotas.keys().cloned().collect();
            model.selected = selection.resolve(&model.pi_options);
            admin_view(&quotas, &model.selected, threshold)
        })
    } else {
        state
            .client
            .members(&session.token)
            .await
            .map(|members| member_view(&members.pi_name, &members.users, threshold))
    };

    match loaded {
        Ok(content) => model.content = Some(content),
        Err(err) if err.is_not_found() => {
            model.content = Some(ChartContent::message(NO_USAGE_DATA));
        }
        Err(err) if err.is_unauthorized() => {
            warn!(username = %session.username, "backend rejected session token");
            state.sessions.remove(id);
            return page(
                PageModel {
                    status: Some(SESSION_EXPIRED.to_string()),
                    content: Some(ChartContent::message(NOT_LOGGED_IN)),
                    ..PageModel::default()
                },
                Some(clear_session_cookie()),
            );
        }
        Err(err) => {
            warn!(username = %session.username, error = %err, "failed to load usage data");
            model.content = Some(ChartContent::message(format!(
                "Failed to load usage data: {}",
                err.user_message()
            )));
        }
    }

    page(model, None)
}

fn page(model: PageModel, cookie: Option<HeaderValue>) -> Response {
    let mut response = (StatusCode::OK, Html(render_page(&model))).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<String> {
        vec!["amy".to_string(), "bob".to_string()]
    }

    #[test]
    fn parses_repeated_pi_params() {
        let selection = Selection::parse(Some("pi=amy&pi=bob&pi=amy&pi="));
        assert_eq!(selection.pis, vec!["amy".to_string(), "bob".to_string()]);
        assert!(!selection.all);
    }

    #[test]
    fn show_all_selects_every_option() {
        let selection = Selection::parse(Some("pi=amy&all=1"));
        assert_eq!(selection.resolve(&options()), options());
    }

    #[test]
    fn unknown_pis_are_dropped() {
        let selection = Selection::parse(Some("pi=zed&pi=bob"));
        assert_eq!(selection.resolve(&options()), vec!["bob".to_string()]);
    }

    #[test]
    fn missing_query_selects_nothing() {
        assert_eq!(Selection::parse(None), Selection::default());
        assert!(Selection::default().resolve(&options()).is_empty());
    }

    #[test]
    fn url_encoded_names_are_decoded() {
        let selection = Selection::parse(Some("pi=dr+smith&pi=o%27neil"));
        assert_eq!(
            selection.pis,
            vec!["dr smith".to_string(), "o'neil".to_string()]
        );
    }
}
