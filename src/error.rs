use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream rejected request with status {status}: {body}")]
    UpstreamRejected { status: u16, body: String },

    #[error("Host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an `UpstreamRejected` error, keeping only a short prefix of the body
    pub fn upstream_rejected(status: u16, body: &str) -> Self {
        AppError::UpstreamRejected {
            status,
            body: body.chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }

    /// Soft failures are expected when optional sources are absent and are not worth a warning
    pub fn is_soft(&self) -> bool {
        matches!(self, AppError::NotConfigured(_) | AppError::NotFound(_))
    }
}

const BODY_SNIPPET_CHARS: usize = 200;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::HostNotAllowed(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::HttpClient(_) | AppError::UpstreamRejected { .. } => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
