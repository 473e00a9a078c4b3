//! Shared test fixtures, mock notification boundaries, and arbitrary
//! generators for property-based testing.

use std::sync::Mutex;
use std::time::Duration;

use crate::notify::{DeliveryError, NotificationRequest, Notifier, SummaryError, SummaryRequest, Summarizer};
use crate::types::{AuthorFlags, CategoryId, PostHalf, PostId, TopicHalf, TopicId, UserId};
use proptest::prelude::*;

/// A topic half by user 100 with no tags.
pub fn topic_half(id: u64, title: &str, category: u64) -> TopicHalf {
    TopicHalf {
        id: TopicId(id),
        title: title.to_string(),
        category_id: CategoryId(category),
        tags: Vec::new(),
        slug: format!("topic-{}", id),
        author_id: UserId(100),
        author_username: "alice".to_string(),
        author_flags: AuthorFlags::default(),
    }
}

/// A post half by user 100 in category 5.
pub fn post_half(topic_id: u64, post_number: u32, raw: &str) -> PostHalf {
    PostHalf {
        id: PostId(topic_id * 10 + post_number as u64),
        topic_id: TopicId(topic_id),
        post_number,
        category_id: CategoryId(5),
        category_slug: String::new(),
        author_id: UserId(100),
        author_username: "alice".to_string(),
        author_flags: AuthorFlags::default(),
        raw: raw.to_string(),
    }
}

pub fn arb_author_flags() -> impl Strategy<Value = AuthorFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>(), 0u8..=4).prop_map(
        |(admin, moderator, staff, trust_level)| AuthorFlags {
            admin,
            moderator,
            staff,
            trust_level,
        },
    )
}

pub fn arb_category_id() -> impl Strategy<Value = CategoryId> {
    (1u64..20).prop_map(CategoryId)
}

pub fn arb_user_id() -> impl Strategy<Value = UserId> {
    (-5i64..50).prop_map(UserId)
}

// ─── Notification boundary mocks ───

/// Records every delivered request.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<NotificationRequest> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    async fn deliver(&self, request: &NotificationRequest) -> Result<(), DeliveryError> {
        self.delivered.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Rejects every request.
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    async fn deliver(&self, _request: &NotificationRequest) -> Result<(), DeliveryError> {
        Err(DeliveryError::Rejected {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        })
    }
}

/// Never finishes within any reasonable timeout.
#[derive(Debug, Default)]
pub struct HangingNotifier;

impl Notifier for HangingNotifier {
    async fn deliver(&self, _request: &NotificationRequest) -> Result<(), DeliveryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

/// Answers every request with the same text.
#[derive(Debug, Clone)]
pub struct FixedSummarizer(pub &'static str);

impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _request: &SummaryRequest) -> Result<String, SummaryError> {
        Ok(self.0.to_string())
    }
}

/// Never finishes within any reasonable timeout.
#[derive(Debug, Clone, Default)]
pub struct HangingSummarizer;

impl Summarizer for HangingSummarizer {
    async fn summarize(&self, _request: &SummaryRequest) -> Result<String, SummaryError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}
