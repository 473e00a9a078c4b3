//! Completion dispatch: turning a completed record into one notification.
//!
//! The dispatcher is invoked only by the caller whose merge returned
//! `completed_now`, so each record reaches it at most once. It summarizes,
//! delivers, and then removes the record from the store whatever the
//! delivery outcome. No store lock is held while any of this runs.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use super::channel::{DeliveryError, Notifier};
use super::request::{FALLBACK_SUMMARY, NotificationRequest, category_label, derive_role};
use super::summary::{SummaryError, SummaryRequest, Summarizer};
use crate::correlator::{CompleteRecord, CorrelatorStore};
use crate::ingest::Policy;
use crate::types::TopicId;

/// Default bound on one delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 15;

/// Default bound on generating a summary.
pub const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 30;

/// Settings for building and sending notifications.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Public forum URL used for permalinks.
    pub base_url: String,
    pub delivery_timeout: Duration,
    pub summary_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            base_url: String::new(),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            summary_timeout: Duration::from_secs(DEFAULT_SUMMARY_TIMEOUT_SECS),
        }
    }
}

/// Hands completed records to the notification boundary.
#[derive(Debug)]
pub struct CompletionDispatcher<N, S> {
    store: Arc<CorrelatorStore>,
    policy: Arc<Policy>,
    settings: DispatchSettings,
    notifier: N,
    summarizer: S,
}

impl<N, S> CompletionDispatcher<N, S>
where
    N: Notifier + Send + Sync,
    S: Summarizer + Send + Sync,
{
    pub fn new(
        store: Arc<CorrelatorStore>,
        policy: Arc<Policy>,
        settings: DispatchSettings,
        notifier: N,
        summarizer: S,
    ) -> Self {
        CompletionDispatcher {
            store,
            policy,
            settings,
            notifier,
            summarizer,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Summarizes and delivers `record`, then removes it from the store.
    ///
    /// Removal happens even if delivery fails or this future is dropped
    /// part-way. Failures are returned for reporting and are never retried.
    #[instrument(skip(self, record), fields(topic_id = %record.topic_id))]
    pub async fn dispatch(&self, record: CompleteRecord) -> Result<(), DeliveryError> {
        let _removal = RemoveOnDrop {
            store: &self.store,
            key: record.topic_id,
        };

        let summary_text = self.summary_for(&record).await;
        let request = NotificationRequest::from_record(
            &record,
            &self.policy,
            &self.settings.base_url,
            summary_text,
        );

        let timeout = self.settings.delivery_timeout;
        let result = match tokio::time::timeout(timeout, self.notifier.deliver(&request)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(timeout)),
        };

        match &result {
            Ok(()) => info!(
                role = %request.author_role,
                thread_id = ?request.thread_id.get(),
                "Notification delivered"
            ),
            Err(e) => error!(error = %e, "Notification delivery failed; dropping record"),
        }

        result
    }

    /// Returns a summary of the post, or the fallback text on any failure.
    async fn summary_for(&self, record: &CompleteRecord) -> String {
        let request = SummaryRequest {
            content: record.post.raw.clone(),
            title: record.topic.title.clone(),
            author_role: derive_role(record, self.policy.leader_trust_level),
            category: category_label(record),
        };

        let timeout = self.settings.summary_timeout;
        let result = match tokio::time::timeout(timeout, self.summarizer.summarize(&request)).await {
            Ok(result) => result,
            Err(_) => Err(SummaryError::Timeout),
        };

        match result {
            Ok(text) => text,
            Err(SummaryError::Disabled) => {
                debug!("Summarizer disabled, using fallback text");
                FALLBACK_SUMMARY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Summary failed, using fallback text");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

/// Removes a key from the store when dropped.
struct RemoveOnDrop<'a> {
    store: &'a CorrelatorStore,
    key: TopicId,
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        if !self.store.remove(self.key) {
            debug!(topic_id = %self.key, "Record already evicted before dispatch finished");
        }
    }
}
