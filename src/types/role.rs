//! Author roles shown in notifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role attributed to a topic's author.
///
/// Ordered from most to least privileged; derivation picks the first that
/// matches (see `notify::request::derive_role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    Admin,
    Moderator,
    Staff,
    /// Trust level at or above the configured leadership threshold.
    Leader,
    Member,
}

impl AuthorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::Admin => "admin",
            AuthorRole::Moderator => "moderator",
            AuthorRole::Staff => "staff",
            AuthorRole::Leader => "leader",
            AuthorRole::Member => "member",
        }
    }

    /// Emoji prefix placed before the author's name.
    pub fn badge(&self) -> &'static str {
        match self {
            AuthorRole::Admin => "👑 ",
            AuthorRole::Moderator => "🛡️ ",
            AuthorRole::Staff => "⭐ ",
            AuthorRole::Leader => "🔥 ",
            AuthorRole::Member => "",
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
