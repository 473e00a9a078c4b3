//! Relay policy: which events to accept and where notifications go.
//!
//! A [`Policy`] is built once from configuration and shared immutably by the
//! ingestion gate and the completion dispatcher.

use std::collections::{HashMap, HashSet};

use crate::types::{CategoryId, ThreadId, UserId};

/// Trust level at which a member is shown as a leader.
pub const DEFAULT_LEADER_TRUST_LEVEL: u8 = 4;

/// Filtering and routing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Authors whose events are dropped (typically bots and the system user).
    pub ignored_users: HashSet<UserId>,

    /// Categories whose events are dropped. Takes priority over `monitored_categories`.
    pub ignored_categories: HashSet<CategoryId>,

    /// Categories to relay. Empty means every category that is not ignored.
    pub monitored_categories: HashSet<CategoryId>,

    /// Paid categories; their notifications carry a subscription notice.
    pub premium_categories: HashSet<CategoryId>,

    /// Per-category destination thread.
    pub category_threads: HashMap<CategoryId, ThreadId>,

    /// Destination thread for categories without a mapping.
    pub default_thread: ThreadId,

    /// Minimum trust level for the leader role.
    pub leader_trust_level: u8,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            ignored_users: HashSet::new(),
            ignored_categories: HashSet::new(),
            monitored_categories: HashSet::new(),
            premium_categories: HashSet::new(),
            category_threads: HashMap::new(),
            default_thread: ThreadId::NONE,
            leader_trust_level: DEFAULT_LEADER_TRUST_LEVEL,
        }
    }
}

impl Policy {
    pub fn should_ignore_user(&self, user: UserId) -> bool {
        self.ignored_users.contains(&user)
    }

    /// Returns true if events in `category` should be relayed.
    pub fn should_monitor_category(&self, category: CategoryId) -> bool {
        if self.ignored_categories.contains(&category) {
            return false;
        }
        self.monitored_categories.is_empty() || self.monitored_categories.contains(&category)
    }

    pub fn is_premium_category(&self, category: CategoryId) -> bool {
        self.premium_categories.contains(&category)
    }

    /// Returns the destination thread for `category`.
    pub fn thread_for_category(&self, category: CategoryId) -> ThreadId {
        self.category_threads
            .get(&category)
            .copied()
            .unwrap_or(self.default_thread)
    }

    pub fn with_ignored_users(mut self, users: impl IntoIterator<Item = i64>) -> Self {
        self.ignored_users = users.into_iter().map(UserId).collect();
        self
    }

    pub fn with_ignored_categories(mut self, categories: impl IntoIterator<Item = u64>) -> Self {
        self.ignored_categories = categories.into_iter().map(CategoryId).collect();
        self
    }

    pub fn with_monitored_categories(mut self, categories: impl IntoIterator<Item = u64>) -> Self {
        self.monitored_categories = categories.into_iter().map(CategoryId).collect();
        self
    }

    pub fn with_premium_categories(mut self, categories: impl IntoIterator<Item = u64>) -> Self {
        self.premium_categories = categories.into_iter().map(CategoryId).collect();
        self
    }
}
