//! The ingestion gate: classify, filter, merge, and trigger dispatch.
//!
//! Filters run before the store is touched, so a dropped event never creates
//! or modifies a record. The gate dispatches only when its own merge reports
//! the incomplete-to-complete transition.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use super::policy::Policy;
use crate::correlator::CorrelatorStore;
use crate::notify::{CompletionDispatcher, DeliveryError, Notifier, Summarizer};
use crate::types::{CategoryId, TopicId, UserId};
use crate::webhooks::{ClassifyError, ForumEvent, classify};

/// Why an event was dropped without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A reply rather than the opening post.
    NotFirstPost { post_number: u32 },
    IgnoredUser(UserId),
    UnmonitoredCategory(CategoryId),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFirstPost { post_number } => write!(f, "post #{} is a reply", post_number),
            SkipReason::IgnoredUser(user) => write!(f, "user {} is ignored", user),
            SkipReason::UnmonitoredCategory(category) => {
                write!(f, "category {} is not monitored", category)
            }
        }
    }
}

/// What happened to an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Skipped(SkipReason),

    /// Merged; the record is still waiting for its other half.
    Pending { topic_id: TopicId },

    /// Merged, completed the record, and the notification was delivered.
    Dispatched { topic_id: TopicId },
}

/// Errors from ingesting an event.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unclassifiable payload: {0}")]
    Classify(#[from] ClassifyError),

    /// The record completed but its notification failed. The record has
    /// already been removed.
    #[error("delivery failed for topic {topic_id}: {source}")]
    Delivery {
        topic_id: TopicId,
        #[source]
        source: DeliveryError,
    },
}

/// Entry point for inbound forum events.
#[derive(Debug)]
pub struct IngestionGate<N, S> {
    policy: Arc<Policy>,
    store: Arc<CorrelatorStore>,
    dispatcher: CompletionDispatcher<N, S>,
}

impl<N, S> IngestionGate<N, S>
where
    N: Notifier + Send + Sync,
    S: Summarizer + Send + Sync,
{
    pub fn new(
        policy: Arc<Policy>,
        store: Arc<CorrelatorStore>,
        dispatcher: CompletionDispatcher<N, S>,
    ) -> Self {
        IngestionGate {
            policy,
            store,
            dispatcher,
        }
    }

    pub fn store(&self) -> &Arc<CorrelatorStore> {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn dispatcher(&self) -> &CompletionDispatcher<N, S> {
        &self.dispatcher
    }

    /// Classifies a raw webhook body and ingests it.
    pub async fn ingest_raw(&self, payload: &[u8]) -> Result<IngestOutcome, IngestError> {
        let event = classify(payload)?;
        self.ingest(event).await
    }

    /// Filters `event`, merges it, and dispatches if this merge completed the
    /// record.
    #[instrument(skip(self, event), fields(kind = event.kind(), topic_id = %event.topic_id()))]
    pub async fn ingest(&self, event: ForumEvent) -> Result<IngestOutcome, IngestError> {
        if let Some(reason) = self.skip_reason(&event) {
            debug!(reason = %reason, "Skipping event");
            return Ok(IngestOutcome::Skipped(reason));
        }

        let topic_id = event.topic_id();
        let snapshot = match event {
            ForumEvent::Topic(topic) => self.store.merge_topic_half(topic_id, topic),
            ForumEvent::Post(post) => self.store.merge_post_half(topic_id, post),
        };

        let Some(record) = snapshot.into_dispatchable() else {
            debug!("Merged half; waiting for counterpart");
            return Ok(IngestOutcome::Pending { topic_id });
        };

        self.dispatcher
            .dispatch(record)
            .await
            .map_err(|source| IngestError::Delivery { topic_id, source })?;

        Ok(IngestOutcome::Dispatched { topic_id })
    }

    /// Applies the filters in order: reply, ignored user, category.
    fn skip_reason(&self, event: &ForumEvent) -> Option<SkipReason> {
        if let ForumEvent::Post(post) = event
            && !post.is_first_post()
        {
            return Some(SkipReason::NotFirstPost {
                post_number: post.post_number,
            });
        }

        let author = event.author_id();
        if self.policy.should_ignore_user(author) {
            return Some(SkipReason::IgnoredUser(author));
        }

        let category = event.category_id();
        if !self.policy.should_monitor_category(category) {
            return Some(SkipReason::UnmonitoredCategory(category));
        }

        None
    }
}
