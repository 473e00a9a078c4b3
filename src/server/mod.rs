//! HTTP server for the forum relay.
//!
//! This module implements the HTTP server that:
//! - Accepts Discourse webhooks, authenticates them, and feeds the ingestion gate
//! - Lists pending partial records for observability
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST <webhook path>` - Accepts a Discourse webhook delivery (default `/webhook`)
//! - `GET /api/v1/pending` - Returns the records still waiting for a half, as JSON
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use crate::ingest::IngestionGate;
use crate::notify::{Notifier, Summarizer};

pub mod health;
pub mod pending;
pub mod webhook;

pub use health::health_handler;
pub use pending::pending_handler;
pub use webhook::webhook_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<N, S> {
    inner: Arc<AppStateInner<N, S>>,
}

struct AppStateInner<N, S> {
    gate: IngestionGate<N, S>,

    /// Shared secret for signature and query-parameter authentication.
    webhook_secret: Vec<u8>,
}

impl<N, S> Clone for AppState<N, S> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N, S> AppState<N, S>
where
    N: Notifier + Send + Sync,
    S: Summarizer + Send + Sync,
{
    pub fn new(gate: IngestionGate<N, S>, webhook_secret: impl Into<Vec<u8>>) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                gate,
                webhook_secret: webhook_secret.into(),
            }),
        }
    }

    pub fn gate(&self) -> &IngestionGate<N, S> {
        &self.inner.gate
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<N, S>(app_state: AppState<N, S>, webhook_path: &str) -> axum::Router
where
    N: Notifier + Send + Sync + 'static,
    S: Summarizer + Send + Sync + 'static,
{
    use axum::routing::{get, post};

    axum::Router::new()
        .route(webhook_path, post(webhook_handler::<N, S>))
        .route("/api/v1/pending", get(pending_handler::<N, S>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::correlator::CorrelatorStore;
    use crate::ingest::Policy;
    use crate::notify::{CompletionDispatcher, DispatchSettings};
    use crate::test_utils::{FailingNotifier, FixedSummarizer, RecordingNotifier};
    use crate::types::TopicId;
    use crate::webhooks::{compute_signature, format_signature_header};

    const SECRET: &[u8] = b"test-secret";

    fn app_state_with<N, S>(notifier: N, summarizer: S) -> AppState<N, S>
    where
        N: Notifier + Send + Sync,
        S: Summarizer + Send + Sync,
    {
        let store = Arc::new(CorrelatorStore::new());
        let policy = Arc::new(Policy::default());
        let dispatcher = CompletionDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&policy),
            DispatchSettings {
                base_url: "https://forum.example.com".to_string(),
                ..DispatchSettings::default()
            },
            notifier,
            summarizer,
        );
        AppState::new(IngestionGate::new(policy, store, dispatcher), SECRET)
    }

    fn test_app_state() -> AppState<RecordingNotifier, FixedSummarizer> {
        app_state_with(RecordingNotifier::default(), FixedSummarizer("Summary."))
    }

    fn signed_request(secret: &[u8], body: &serde_json::Value) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature = format_signature_header(&compute_signature(&body_bytes, secret));

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-discourse-event", "topic_created")
            .header("x-discourse-event-signature", signature)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn topic_body() -> serde_json::Value {
        json!({ "topic": { "id": 42, "title": "Test", "category_id": 5, "slug": "test" } })
    }

    fn post_body() -> serde_json::Value {
        json!({ "post": { "id": 420, "post_number": 1, "topic_id": 42, "category_id": 5, "raw": "Hi" } })
    }

    // ─── Health endpoint tests ───

    #[tokio::test]
    async fn health_returns_200() {
        let app = build_router(test_app_state(), "/webhook");

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    // ─── Webhook endpoint tests ───

    #[tokio::test]
    async fn webhook_pair_delivers_one_notification() {
        let state = test_app_state();

        let response = build_router(state.clone(), "/webhook")
            .oneshot(signed_request(SECRET, &topic_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.gate().store().contains(TopicId(42)));

        let response = build_router(state.clone(), "/webhook")
            .oneshot(signed_request(SECRET, &post_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(state.gate().dispatcher().notifier().count(), 1);
        assert!(state.gate().store().is_empty());
    }

    #[tokio::test]
    async fn webhook_invalid_signature_returns_401() {
        let state = test_app_state();
        let app = build_router(state.clone(), "/webhook");

        let response = app
            .oneshot(signed_request(b"wrong-secret", &topic_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.gate().store().is_empty());
    }

    #[tokio::test]
    async fn webhook_without_credentials_returns_401() {
        let state = test_app_state();
        let app = build_router(state.clone(), "/webhook");

        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(serde_json::to_vec(&topic_body()).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.gate().store().is_empty());
    }

    #[tokio::test]
    async fn webhook_query_secret_is_accepted() {
        let state = test_app_state();
        let app = build_router(state.clone(), "/hooks/discourse");

        let request = Request::builder()
            .method("POST")
            .uri("/hooks/discourse?secret=test-secret")
            .body(Body::from(serde_json::to_vec(&topic_body()).unwrap()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.gate().store().contains(TopicId(42)));
    }

    #[tokio::test]
    async fn webhook_unknown_shape_returns_400() {
        let state = test_app_state();
        let app = build_router(state.clone(), "/webhook");

        let response = app
            .oneshot(signed_request(SECRET, &json!({ "user": { "id": 1 } })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.gate().store().is_empty());
    }

    #[tokio::test]
    async fn webhook_reply_post_returns_200_without_mutation() {
        let state = test_app_state();
        let app = build_router(state.clone(), "/webhook");

        let body = json!({ "post": { "id": 421, "post_number": 2, "topic_id": 42, "category_id": 5 } });
        let response = app.oneshot(signed_request(SECRET, &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.gate().store().is_empty());
    }

    #[tokio::test]
    async fn webhook_delivery_failure_returns_502() {
        let state = app_state_with(FailingNotifier, FixedSummarizer("x"));

        build_router(state.clone(), "/webhook")
            .oneshot(signed_request(SECRET, &topic_body()))
            .await
            .unwrap();
        let response = build_router(state.clone(), "/webhook")
            .oneshot(signed_request(SECRET, &post_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.gate().store().is_empty());
    }

    // ─── Pending endpoint tests ───

    #[tokio::test]
    async fn pending_lists_partial_records() {
        let state = test_app_state();

        build_router(state.clone(), "/webhook")
            .oneshot(signed_request(SECRET, &topic_body()))
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/api/v1/pending")
            .body(Body::empty())
            .unwrap();
        let response = build_router(state, "/webhook").oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["records"][0]["topic_id"], 42);
        assert_eq!(parsed["records"][0]["has_topic"], true);
        assert_eq!(parsed["records"][0]["has_post"], false);
    }
}
