use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("quota API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to parse response: {0}")]
    Serialization(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DashboardError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DashboardError::Api { status: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::Api { status: 404, .. })
    }

    /// Text suitable for the status line; backend messages are shown verbatim.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return DashboardError::Api {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        if error.is_timeout() {
            return DashboardError::Network("request timed out".to_string());
        }

        if error.is_connect() {
            return DashboardError::Network("failed to connect to quota API".to_string());
        }

        if error.is_decode() {
            return DashboardError::Serialization(error.to_string());
        }

        DashboardError::Network(error.to_string())
    }
}

impl From<url::ParseError> for DashboardError {
    fn from(error: url::ParseError) -> Self {
        DashboardError::Config(error.to_string())
    }
}
