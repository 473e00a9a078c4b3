//! Liveness endpoint.

use axum::http::StatusCode;

/// Returns 200 with the body `OK` while the server accepts connections.
///
/// Does not check Telegram or the summarizer; an outage there shows up as
/// 502 responses on the webhook endpoint instead.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
