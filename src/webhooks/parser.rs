//! Discourse webhook payload classifier.
//!
//! This module turns raw webhook JSON into a typed [`ForumEvent`]. The event
//! kind is decided by the body's shape rather than by headers:
//!
//! 1. A `topic` object with a non-zero `id` is a topic event
//! 2. Otherwise a `post` object with a non-zero `id` is a post event
//! 3. Anything else is a classification failure
//!
//! Fields the relay does not need are ignored, and missing optional fields
//! fall back to empty values. Discourse has changed the encoding of `tags`
//! between versions (plain strings vs. `{ "name": ... }` objects); both are
//! accepted.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{AuthorFlags, CategoryId, PostHalf, PostId, TopicHalf, TopicId, UserId};

use super::events::ForumEvent;

/// Error type for payloads that are neither a topic nor a post event.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The body is not JSON at all.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is JSON but has no recognizable topic or post object.
    #[error("unrecognized webhook payload: expected a topic or post object")]
    UnknownShape,

    /// A post event that cannot be correlated with any topic.
    #[error("post payload is missing {0}")]
    MissingField(&'static str),
}

/// Classifies a webhook payload.
///
/// # Examples
///
/// ```
/// use forum_relay::webhooks::{ForumEvent, classify};
///
/// let payload = br#"{"topic": {"id": 42, "title": "Test", "category_id": 5}}"#;
/// let event = classify(payload).unwrap();
/// assert!(matches!(event, ForumEvent::Topic(_)));
///
/// assert!(classify(br#"{"user": {"id": 1}}"#).is_err());
/// ```
pub fn classify(payload: &[u8]) -> Result<ForumEvent, ClassifyError> {
    let body: serde_json::Value = serde_json::from_slice(payload)?;

    if let Some(raw) = body.get("topic").and_then(decode::<RawTopic>)
        && raw.id.unwrap_or(0) != 0
    {
        return Ok(ForumEvent::Topic(raw.into_half()));
    }

    if let Some(raw) = body.get("post").and_then(decode::<RawPost>)
        && raw.id.unwrap_or(0) != 0
    {
        return raw.into_half().map(ForumEvent::Post);
    }

    Err(ClassifyError::UnknownShape)
}

/// Decodes one payload object, treating a malformed object as absent so the
/// other shape still gets a chance.
fn decode<T: for<'de> Deserialize<'de>>(value: &serde_json::Value) -> Option<T> {
    T::deserialize(value).ok()
}

// ============================================================================
// Raw payload structures for deserialization
//
// These match Discourse's webhook JSON. Everything is optional; required
// fields are checked explicitly during conversion.
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUser {
    username: Option<String>,
    admin: Option<bool>,
    moderator: Option<bool>,
    staff: Option<bool>,
    trust_level: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Name(String),
    Object { name: String },
}

impl RawTag {
    fn into_name(self) -> String {
        match self {
            RawTag::Name(name) | RawTag::Object { name } => name,
        }
    }
}

// ============================================================================
// topic_created
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTopic {
    id: Option<u64>,
    title: Option<String>,
    category_id: Option<u64>,
    tags: Option<Vec<RawTag>>,
    slug: Option<String>,
    user_id: Option<i64>,
    created_by: Option<RawUser>,
}

impl RawTopic {
    fn into_half(self) -> TopicHalf {
        let created_by = self.created_by.unwrap_or_default();
        TopicHalf {
            id: TopicId(self.id.unwrap_or(0)),
            title: self.title.unwrap_or_default(),
            category_id: CategoryId(self.category_id.unwrap_or(0)),
            tags: self
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(RawTag::into_name)
                .collect(),
            slug: self.slug.unwrap_or_default(),
            author_id: UserId(self.user_id.unwrap_or(0)),
            author_username: created_by.username.unwrap_or_default(),
            author_flags: AuthorFlags {
                admin: created_by.admin.unwrap_or(false),
                moderator: created_by.moderator.unwrap_or(false),
                staff: created_by.staff.unwrap_or(false),
                trust_level: created_by.trust_level.unwrap_or(0),
            },
        }
    }
}

// ============================================================================
// post_created
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPost {
    id: Option<u64>,
    post_number: Option<u32>,
    topic_id: Option<u64>,
    category_id: Option<u64>,
    category_slug: Option<String>,
    user_id: Option<i64>,
    username: Option<String>,
    admin: Option<bool>,
    moderator: Option<bool>,
    staff: Option<bool>,
    trust_level: Option<u8>,
    raw: Option<String>,
}

impl RawPost {
    fn into_half(self) -> Result<PostHalf, ClassifyError> {
        let topic_id = match self.topic_id {
            Some(id) if id != 0 => TopicId(id),
            _ => return Err(ClassifyError::MissingField("topic_id")),
        };
        let post_number = self
            .post_number
            .ok_or(ClassifyError::MissingField("post_number"))?;

        Ok(PostHalf {
            id: PostId(self.id.unwrap_or(0)),
            topic_id,
            post_number,
            category_id: CategoryId(self.category_id.unwrap_or(0)),
            category_slug: self.category_slug.unwrap_or_default(),
            author_id: UserId(self.user_id.unwrap_or(0)),
            author_username: self.username.unwrap_or_default(),
            author_flags: AuthorFlags {
                admin: self.admin.unwrap_or(false),
                moderator: self.moderator.unwrap_or(false),
                staff: self.staff.unwrap_or(false),
                trust_level: self.trust_level.unwrap_or(0),
            },
            raw: self.raw.unwrap_or_default(),
        })
    }
}
