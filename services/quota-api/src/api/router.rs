use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers;
use super::ApiState;

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )))
        .layer(cors_layer(&state.config.cors_allowed_origins));

    let mut router = Router::new()
        .route("/token", post(handlers::issue_token))
        .route("/api/login", post(handlers::api_login))
        .route("/users/me/", get(handlers::read_users_me))
        .route("/api/v2/members/", get(handlers::list_members))
        .route("/api/v2/summary/", get(handlers::get_summary))
        .route(
            "/api/v2/summary/history/",
            get(handlers::get_summary_history),
        )
        .route("/api/v2/admin/quotas/", get(handlers::admin_quotas))
        .route("/health", get(handlers::health_check));

    if state.config.enable_debug_routes {
        warn!("debug routes enabled; /debug/users/ is unauthenticated");
        router = router.route("/debug/users/", get(handlers::debug_users));
    }

    router.with_state(state).layer(middleware)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
