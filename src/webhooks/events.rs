//! Typed forum webhook events.
//!
//! Discourse emits one webhook when a topic is created and another for each
//! post. The relay cares about exactly these two shapes; each carries one half
//! of a notification.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, PostHalf, TopicHalf, TopicId, UserId};

/// A classified forum webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForumEvent {
    /// A topic was created.
    Topic(TopicHalf),

    /// A post was created. Only the first post of a topic is correlated;
    /// the ingestion gate skips the rest.
    Post(PostHalf),
}

impl ForumEvent {
    /// Returns the topic this event belongs to (the correlation key).
    pub fn topic_id(&self) -> TopicId {
        match self {
            ForumEvent::Topic(topic) => topic.id,
            ForumEvent::Post(post) => post.topic_id,
        }
    }

    /// Returns the authoring user.
    pub fn author_id(&self) -> UserId {
        match self {
            ForumEvent::Topic(topic) => topic.author_id,
            ForumEvent::Post(post) => post.author_id,
        }
    }

    /// Returns the category the event was posted in.
    pub fn category_id(&self) -> CategoryId {
        match self {
            ForumEvent::Topic(topic) => topic.category_id,
            ForumEvent::Post(post) => post.category_id,
        }
    }

    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ForumEvent::Topic(_) => "topic",
            ForumEvent::Post(_) => "post",
        }
    }
}
