//! Webhook endpoint handler.
//!
//! Authenticates Discourse webhook deliveries and feeds them to the ingestion
//! gate. The response is sent after ingestion finishes, so a delivery that
//! completes a record waits for its notification to be sent.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::ingest::{IngestError, IngestOutcome};
use crate::notify::{Notifier, Summarizer};
use crate::webhooks::authenticate;

/// Header name for the Discourse event type.
const HEADER_EVENT: &str = "x-discourse-event";
/// Header name for the Discourse delivery id.
const HEADER_EVENT_ID: &str = "x-discourse-event-id";
/// Header name for the Discourse signature.
const HEADER_SIGNATURE: &str = "x-discourse-event-signature";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or wrong signature or query secret.
    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::Ingest(IngestError::Classify(_)) => StatusCode::BAD_REQUEST,
            WebhookError::Ingest(IngestError::Delivery { .. }) => StatusCode::BAD_GATEWAY,
        };

        (status, self.to_string()).into_response()
    }
}

/// Query parameters accepted on the webhook URL.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    /// Shared secret, for senders that cannot sign requests.
    pub secret: Option<String>,
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Authentication, one of:
///   - `X-Discourse-Event-Signature: sha256=<hex>` (HMAC-SHA256 of the body)
///   - `?secret=<shared secret>` when the signature header is absent
/// - Body: a Discourse topic or post webhook payload
///
/// # Response
///
/// - 200 OK: Event accepted (merged, dispatched, or deliberately skipped)
/// - 400 Bad Request: Body is neither a topic nor a post event
/// - 401 Unauthorized: Missing or invalid credentials
/// - 502 Bad Gateway: The notification could not be delivered
pub async fn webhook_handler<N, S>(
    State(app_state): State<AppState<N, S>>,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError>
where
    N: Notifier + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    let event_type = get_header(&headers, HEADER_EVENT).unwrap_or("unknown");
    let event_id = get_header(&headers, HEADER_EVENT_ID).unwrap_or("-");

    debug!(
        event_type = %event_type,
        event_id = %event_id,
        bytes = body.len(),
        "Received webhook"
    );

    // Authenticate before parsing anything.
    if !authenticate(
        &body,
        get_header(&headers, HEADER_SIGNATURE),
        query.secret.as_deref(),
        app_state.webhook_secret(),
    ) {
        warn!(event_type = %event_type, event_id = %event_id, "Rejected unauthenticated webhook");
        return Err(WebhookError::Unauthorized);
    }

    match app_state.gate().ingest_raw(&body).await {
        Ok(outcome) => {
            log_outcome(event_type, event_id, &outcome);
            Ok((StatusCode::OK, "OK"))
        }
        Err(e) => {
            warn!(event_type = %event_type, event_id = %event_id, error = %e, "Webhook failed");
            Err(WebhookError::Ingest(e))
        }
    }
}

fn log_outcome(event_type: &str, event_id: &str, outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Skipped(reason) => {
            debug!(event_type = %event_type, event_id = %event_id, reason = %reason, "Webhook skipped");
        }
        IngestOutcome::Pending { topic_id } => {
            debug!(event_type = %event_type, event_id = %event_id, topic_id = %topic_id, "Webhook merged");
        }
        IngestOutcome::Dispatched { topic_id } => {
            info!(event_type = %event_type, event_id = %event_id, topic_id = %topic_id, "Webhook completed a topic");
        }
    }
}

/// Returns a header value if present and valid UTF-8.
fn get_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
