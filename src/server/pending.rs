//! Pending-record listing for observability.
//!
//! Shows which topics are still waiting for their other half and for how
//! long. Useful for spotting a webhook type that Discourse is not sending.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use crate::correlator::PendingSummary;
use crate::notify::{Notifier, Summarizer};

/// Body of `GET /api/v1/pending`.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub count: usize,

    /// Oldest first.
    pub records: Vec<PendingSummary>,
}

/// Pending-record handler.
///
/// # Example
///
/// ```ignore
/// GET /api/v1/pending HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {"count":1,"records":[{"topic_id":42,"has_topic":true,"has_post":false,"age_secs":12}]}
/// ```
pub async fn pending_handler<N, S>(State(app_state): State<AppState<N, S>>) -> Json<PendingResponse>
where
    N: Notifier + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    let mut records = app_state.gate().store().pending(Utc::now());
    records.sort_by_key(|record| std::cmp::Reverse(record.age_secs));

    Json(PendingResponse {
        count: records.len(),
        records,
    })
}
