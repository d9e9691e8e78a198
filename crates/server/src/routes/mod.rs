//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Health checks and readiness
//! - `checks`: Check submission and retrieval

pub mod checks;
pub mod health;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /) and requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "simcheck server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/checks",
            "/api/checks/{id}",
            "/health",
            "/ready"
        ]
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
