//! The two partial payloads that together describe a new forum topic.
//!
//! Discourse announces a new topic with two independent webhooks: one for the
//! topic itself and one for its first post. Neither alone carries everything a
//! notification needs, so each is stored as a "half" until its counterpart
//! arrives.

use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, PostId, TopicId, UserId};

/// Role-relevant flags of a forum user, as reported by Discourse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFlags {
    pub admin: bool,
    pub moderator: bool,
    pub staff: bool,
    pub trust_level: u8,
}

/// The topic-creation half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicHalf {
    pub id: TopicId,
    pub title: String,
    pub category_id: CategoryId,
    pub tags: Vec<String>,
    pub slug: String,

    /// The topic creator's user id.
    pub author_id: UserId,

    /// The topic creator's username, empty when the payload omitted it.
    pub author_username: String,

    /// The topic creator's flags. These can be incomplete in topic payloads;
    /// the post half's flags win when both are present.
    pub author_flags: AuthorFlags,
}

/// The first-post half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHalf {
    pub id: PostId,
    pub topic_id: TopicId,

    /// Position within the topic. Only `1` is ever correlated.
    pub post_number: u32,

    pub category_id: CategoryId,

    /// Category slug, empty when the payload omitted it.
    pub category_slug: String,

    pub author_id: UserId,
    pub author_username: String,
    pub author_flags: AuthorFlags,

    /// Raw markdown content of the post.
    pub raw: String,
}

impl PostHalf {
    /// Returns true if this is the opening post of its topic.
    pub fn is_first_post(&self) -> bool {
        self.post_number == 1
    }
}
