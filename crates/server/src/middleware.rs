//! Request-id propagation.
//!
//! Request/response logging itself belongs to the router's `TraceLayer`;
//! this layer only guarantees every request carries an id — inbound or
//! freshly generated — and echoes it on the response so check log lines
//! can be joined with upstream gateway logs.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request identifier, reachable from handlers via extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accept an inbound `x-request-id` or mint one, expose it to handlers
/// and echo it back on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    // Invalid bytes in a caller-supplied id just mean no echo header.
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
