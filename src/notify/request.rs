//! Building a notification from a completed record.
//!
//! The two halves overlap (both carry the category and the author), so this
//! module decides which half is authoritative for each field:
//!
//! - **Role**: post-half flags first, then the topic creator's flags
//! - **Author name**: topic creator, then post author
//! - **Category label**: post's category slug, then the topic's category id
//! - **Title, tags, slug, premium, destination**: topic half

use serde::Serialize;

use crate::correlator::CompleteRecord;
use crate::ingest::Policy;
use crate::types::{AuthorFlags, AuthorRole, ThreadId, TopicId};

/// Text used when no summary could be generated.
pub const FALLBACK_SUMMARY: &str = "Summary unavailable.";

/// A structured notification, ready for a [`super::Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub topic_id: TopicId,
    pub author_display_name: String,
    pub author_role: AuthorRole,
    pub topic_title: String,
    pub category_label: String,
    pub summary_text: String,
    pub permalink: String,
    pub tags: Vec<String>,
    pub is_premium_category: bool,

    /// Destination thread in the chat.
    pub thread_id: ThreadId,
}

impl NotificationRequest {
    /// Assembles the request for `record` with an already-generated summary.
    pub fn from_record(
        record: &CompleteRecord,
        policy: &Policy,
        base_url: &str,
        summary_text: String,
    ) -> Self {
        let category = record.topic.category_id;
        NotificationRequest {
            topic_id: record.topic_id,
            author_display_name: author_display_name(record),
            author_role: derive_role(record, policy.leader_trust_level),
            topic_title: record.topic.title.clone(),
            category_label: category_label(record),
            summary_text,
            permalink: permalink(base_url, &record.topic.slug, record.topic_id),
            tags: record.topic.tags.clone(),
            is_premium_category: policy.is_premium_category(category),
            thread_id: policy.thread_for_category(category),
        }
    }
}

/// Derives the author's role.
///
/// First match wins: admin, moderator, staff, trust level at or above
/// `leader_trust_level`. The post half's flags are checked before the topic
/// creator's; if neither matches, the author is a member.
pub fn derive_role(record: &CompleteRecord, leader_trust_level: u8) -> AuthorRole {
    role_from_flags(&record.post.author_flags, leader_trust_level)
        .or_else(|| role_from_flags(&record.topic.author_flags, leader_trust_level))
        .unwrap_or(AuthorRole::Member)
}

fn role_from_flags(flags: &AuthorFlags, leader_trust_level: u8) -> Option<AuthorRole> {
    if flags.admin {
        Some(AuthorRole::Admin)
    } else if flags.moderator {
        Some(AuthorRole::Moderator)
    } else if flags.staff {
        Some(AuthorRole::Staff)
    } else if flags.trust_level >= leader_trust_level {
        Some(AuthorRole::Leader)
    } else {
        None
    }
}

fn author_display_name(record: &CompleteRecord) -> String {
    [&record.topic.author_username, &record.post.author_username]
        .into_iter()
        .find(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("user {}", record.post.author_id))
}

/// Human-readable category name.
///
/// `"general-talk"` becomes `"General talk"`. Without a slug the numeric id is
/// shown instead.
pub fn category_label(record: &CompleteRecord) -> String {
    let slug = record.post.category_slug.trim();
    if slug.is_empty() {
        return format!("Category {}", record.topic.category_id);
    }

    let spaced = slug.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Link to the topic on the forum.
pub fn permalink(base_url: &str, slug: &str, topic_id: TopicId) -> String {
    let base_url = base_url.trim_end_matches('/');
    if slug.is_empty() {
        format!("{}/t/{}", base_url, topic_id)
    } else {
        format!("{}/t/{}/{}", base_url, slug, topic_id)
    }
}
