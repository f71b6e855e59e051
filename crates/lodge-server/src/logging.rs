//! Request logging middleware.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::session::CurrentSession;

/// Log method, path, status, latency and session of every request.
///
/// Place inside [`session_middleware`](crate::session_middleware) so the
/// session identifier is available.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session_id = request
        .extensions()
        .get::<CurrentSession>()
        .map(|s| s.id().to_string())
        .unwrap_or_default();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            session_id = %session_id,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            session_id = %session_id,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            session_id = %session_id,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}
