use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::auth::AuthError;

use super::types::ErrorResponse;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
    challenge: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownUser | AuthError::WrongPassword => {
                unauthorized("invalid_credentials", &err.to_string())
            }
            AuthError::InvalidToken(_) | AuthError::UnknownSubject => {
                unauthorized("invalid_token", "Could not validate credentials")
            }
            AuthError::InactiveUser => bad_request("inactive_user", "Inactive user"),
            AuthError::Hash(_) | AuthError::Encoding(_) | AuthError::Storage(_) => {
                internal_error(err)
            }
        }
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        },
        challenge: false,
    }
}

pub fn bad_request(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn unauthorized(code: &str, message: &str) -> ApiError {
    ApiError {
        challenge: true,
        ..api_error(StatusCode::UNAUTHORIZED, code, message)
    }
}

pub fn forbidden(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, code, message)
}

pub fn not_found(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, code, message)
}

pub fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!(error = %err, "quota API internal error");
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            details: Some(serde_json::json!({ "message": err.to_string() })),
        },
        challenge: false,
    }
}
