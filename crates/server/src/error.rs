use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use checker::CheckError;
use store::StoreError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Check error: {0}")]
    Check(#[from] CheckError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Check(err) => match err {
                CheckError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CheckError::NoActiveParams => StatusCode::CONFLICT,
                CheckError::EmptyOrTooShort { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CheckError::Deadline { .. } => StatusCode::GATEWAY_TIMEOUT,
                // Storage failures and cancellations surface as a generic
                // 5xx; detail stays in the server logs.
                CheckError::Persistence(_) | CheckError::Cancelled => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Check(err) => err.kind(),
            ServerError::Store(_) => "PERSISTENCE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    /// Message shown to API clients; internal failures stay generic.
    fn public_message(&self) -> String {
        match self {
            ServerError::Check(CheckError::Persistence(_))
            | ServerError::Store(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.public_message();

        if status.is_server_error() {
            tracing::error!(code = %error_code, error = %self, "request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("Invalid address: {err}"))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_error_kinds_map_to_statuses() {
        let err = ServerError::Check(CheckError::InvalidInput("bad".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err = ServerError::Check(CheckError::EmptyOrTooShort { len: 1, k: 5 });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ServerError::Check(CheckError::NoActiveParams);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn persistence_failures_stay_generic() {
        let err = ServerError::Check(CheckError::Persistence(StoreError::Backend("x".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal error");
        assert_eq!(err.error_code(), "PERSISTENCE");
    }
}
