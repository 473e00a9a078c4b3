//! Keyed table of partial records awaiting their counterpart half.
//!
//! Every operation takes the table lock exactly once and releases it before
//! returning, so callers never hold it across an `.await`. Merges return a
//! [`RecordSnapshot`] taken under the same lock as the mutation; the
//! `completed_now` flag in that snapshot is the only signal that may trigger a
//! dispatch.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::types::{PostHalf, TopicHalf, TopicId};

/// One table entry: whichever halves have arrived so far.
#[derive(Debug, Clone)]
struct PartialRecord {
    topic: Option<TopicHalf>,
    post: Option<PostHalf>,

    /// Set when the first half arrives. Never updated afterwards.
    created_at: DateTime<Utc>,
}

impl PartialRecord {
    fn new(created_at: DateTime<Utc>) -> Self {
        PartialRecord {
            topic: None,
            post: None,
            created_at,
        }
    }

    fn is_complete(&self) -> bool {
        self.topic.is_some() && self.post.is_some()
    }
}

/// State of a record immediately after a merge.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    pub topic_id: TopicId,
    pub topic: Option<TopicHalf>,
    pub post: Option<PostHalf>,
    pub created_at: DateTime<Utc>,

    /// Both halves are present.
    pub complete: bool,

    /// This merge is the one that made the record complete.
    ///
    /// For any key this is true for at most one merge between the record's
    /// creation and its removal.
    pub completed_now: bool,
}

impl RecordSnapshot {
    /// Converts the snapshot into a [`CompleteRecord`] if this merge owns the
    /// incomplete-to-complete transition.
    pub fn into_dispatchable(self) -> Option<CompleteRecord> {
        if !self.completed_now {
            return None;
        }
        match (self.topic, self.post) {
            (Some(topic), Some(post)) => Some(CompleteRecord {
                topic_id: self.topic_id,
                topic,
                post,
                created_at: self.created_at,
            }),
            _ => None,
        }
    }
}

/// A record with both halves, owned by the caller that completed it.
#[derive(Debug, Clone)]
pub struct CompleteRecord {
    pub topic_id: TopicId,
    pub topic: TopicHalf,
    pub post: PostHalf,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of entries evicted.
    pub removed: usize,

    /// Evicted entries that had both halves. A complete record should have
    /// been removed by its dispatcher; seeing one here means that removal was
    /// skipped or delayed past the TTL.
    pub removed_complete: Vec<TopicId>,
}

/// A pending entry, as exposed by the observability endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub topic_id: TopicId,
    pub has_topic: bool,
    pub has_post: bool,
    pub age_secs: i64,
}

/// Concurrency-safe table of partial records keyed by topic id.
#[derive(Debug, Default)]
pub struct CorrelatorStore {
    records: RwLock<HashMap<TopicId, PartialRecord>>,
}

impl CorrelatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or overwrites) the topic half for `key`.
    ///
    /// Creates the entry if absent, stamping `created_at` with the current
    /// time. Overwriting keeps the original `created_at`.
    pub fn merge_topic_half(&self, key: TopicId, topic: TopicHalf) -> RecordSnapshot {
        self.merge_with(key, |record| record.topic = Some(topic))
    }

    /// Stores (or overwrites) the post half for `key`.
    pub fn merge_post_half(&self, key: TopicId, post: PostHalf) -> RecordSnapshot {
        self.merge_with(key, |record| record.post = Some(post))
    }

    fn merge_with(&self, key: TopicId, apply: impl FnOnce(&mut PartialRecord)) -> RecordSnapshot {
        let now = Utc::now();
        let mut records = self.write();

        let record = records
            .entry(key)
            .or_insert_with(|| PartialRecord::new(now));
        let was_complete = record.is_complete();
        apply(record);
        let complete = record.is_complete();

        RecordSnapshot {
            topic_id: key,
            topic: record.topic.clone(),
            post: record.post.clone(),
            created_at: record.created_at,
            complete,
            completed_now: complete && !was_complete,
        }
    }

    /// Removes the entry for `key`.
    ///
    /// Returns whether an entry was present. Removing an absent key is not an
    /// error: the dispatcher and the sweeper may both try.
    pub fn remove(&self, key: TopicId) -> bool {
        self.write().remove(&key).is_some()
    }

    /// Evicts every entry with `now - created_at > max_age`, complete or not.
    pub fn sweep_expired(&self, max_age: Duration, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let mut records = self.write();

        records.retain(|topic_id, record| {
            let expired = now.signed_duration_since(record.created_at) > max_age;
            if expired {
                report.removed += 1;
                if record.is_complete() {
                    report.removed_complete.push(*topic_id);
                }
            }
            !expired
        });

        report
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, key: TopicId) -> bool {
        self.read().contains_key(&key)
    }

    /// Lists pending entries ordered by topic id.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<PendingSummary> {
        let mut pending: Vec<PendingSummary> = self
            .read()
            .iter()
            .map(|(topic_id, record)| PendingSummary {
                topic_id: *topic_id,
                has_topic: record.topic.is_some(),
                has_post: record.post.is_some(),
                age_secs: now.signed_duration_since(record.created_at).num_seconds(),
            })
            .collect();
        pending.sort_by_key(|p| p.topic_id);
        pending
    }

    // A panic while holding the lock cannot leave a half-applied entry: every
    // mutation is a single map operation on plain data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<TopicId, PartialRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TopicId, PartialRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{post_half, topic_half};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ─── Merge ───

    #[test]
    fn topic_then_post_completes_on_second_merge() {
        let store = CorrelatorStore::new();

        let first = store.merge_topic_half(TopicId(42), topic_half(42, "Test", 5));
        assert!(!first.complete);
        assert!(!first.completed_now);

        let second = store.merge_post_half(TopicId(42), post_half(42, 1, "Hello"));
        assert!(second.complete);
        assert!(second.completed_now);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn post_then_topic_completes_on_second_merge() {
        let store = CorrelatorStore::new();

        let first = store.merge_post_half(TopicId(7), post_half(7, 1, "Hello"));
        assert!(!first.complete);

        let second = store.merge_topic_half(TopicId(7), topic_half(7, "Title", 1));
        assert!(second.complete);
        assert!(second.completed_now);
    }

    #[test]
    fn duplicate_half_overwrites_without_resetting_created_at() {
        let store = CorrelatorStore::new();

        let first = store.merge_topic_half(TopicId(1), topic_half(1, "Old", 3));
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.merge_topic_half(TopicId(1), topic_half(1, "New", 3));

        assert_eq!(store.len(), 1);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.topic.unwrap().title, "New");
        assert!(!second.complete);
    }

    #[test]
    fn merging_into_complete_record_does_not_complete_again() {
        let store = CorrelatorStore::new();
        store.merge_topic_half(TopicId(3), topic_half(3, "T", 1));
        let completing = store.merge_post_half(TopicId(3), post_half(3, 1, "a"));
        assert!(completing.completed_now);

        let repeat = store.merge_post_half(TopicId(3), post_half(3, 1, "b"));
        assert!(repeat.complete);
        assert!(!repeat.completed_now);
        assert!(repeat.into_dispatchable().is_none());
    }

    #[test]
    fn into_dispatchable_carries_both_halves() {
        let store = CorrelatorStore::new();
        store.merge_topic_half(TopicId(42), topic_half(42, "Test", 5));
        let record = store
            .merge_post_half(TopicId(42), post_half(42, 1, "Hello"))
            .into_dispatchable()
            .unwrap();

        assert_eq!(record.topic_id, TopicId(42));
        assert_eq!(record.topic.title, "Test");
        assert_eq!(record.post.raw, "Hello");
    }

    #[test]
    fn incomplete_snapshot_is_not_dispatchable() {
        let store = CorrelatorStore::new();
        let snapshot = store.merge_topic_half(TopicId(9), topic_half(9, "T", 1));
        assert!(snapshot.into_dispatchable().is_none());
    }

    // ─── Remove ───

    #[test]
    fn remove_is_idempotent() {
        let store = CorrelatorStore::new();
        store.merge_topic_half(TopicId(5), topic_half(5, "T", 1));

        assert!(store.remove(TopicId(5)));
        assert!(!store.remove(TopicId(5)));
        assert!(!store.remove(TopicId(6)));
        assert!(store.is_empty());
    }

    #[test]
    fn record_recreated_after_removal_starts_fresh() {
        let store = CorrelatorStore::new();
        store.merge_topic_half(TopicId(5), topic_half(5, "T", 1));
        store.merge_post_half(TopicId(5), post_half(5, 1, "x"));
        store.remove(TopicId(5));

        let snapshot = store.merge_post_half(TopicId(5), post_half(5, 1, "x"));
        assert!(!snapshot.complete);
        assert!(snapshot.topic.is_none());
    }

    // ─── Sweep ───

    #[test]
    fn sweep_removes_entries_older_than_max_age() {
        let store = CorrelatorStore::new();
        let snapshot = store.merge_post_half(TopicId(99), post_half(99, 1, "orphan"));
        let ttl = Duration::minutes(5);

        let report = store.sweep_expired(ttl, snapshot.created_at + ttl + Duration::seconds(1));

        assert_eq!(report.removed, 1);
        assert!(report.removed_complete.is_empty());
        assert!(!store.contains(TopicId(99)));
    }

    #[test]
    fn sweep_keeps_entries_at_exactly_max_age() {
        let store = CorrelatorStore::new();
        let snapshot = store.merge_post_half(TopicId(99), post_half(99, 1, "orphan"));
        let ttl = Duration::minutes(5);

        let report = store.sweep_expired(ttl, snapshot.created_at + ttl);

        assert_eq!(report.removed, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_reports_complete_entries() {
        let store = CorrelatorStore::new();
        store.merge_topic_half(TopicId(1), topic_half(1, "T", 1));
        let snapshot = store.merge_post_half(TopicId(1), post_half(1, 1, "x"));
        store.merge_topic_half(TopicId(2), topic_half(2, "T", 1));

        let report = store.sweep_expired(Duration::zero(), snapshot.created_at + Duration::hours(1));

        assert_eq!(report.removed, 2);
        assert_eq!(report.removed_complete, vec![TopicId(1)]);
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_only_touches_expired_entries() {
        let store = CorrelatorStore::new();
        let old = store.merge_topic_half(TopicId(1), topic_half(1, "old", 1));
        let cutoff = old.created_at + Duration::seconds(10);

        let report = store.sweep_expired(Duration::seconds(10), cutoff);
        assert_eq!(report.removed, 0);

        let report = store.sweep_expired(Duration::seconds(10), cutoff + Duration::milliseconds(1));
        assert_eq!(report.removed, 1);
    }

    // ─── Pending listing ───

    #[test]
    fn pending_lists_halves_sorted_by_topic() {
        let store = CorrelatorStore::new();
        store.merge_post_half(TopicId(20), post_half(20, 1, "x"));
        let snapshot = store.merge_topic_half(TopicId(10), topic_half(10, "T", 1));

        let pending = store.pending(snapshot.created_at + Duration::seconds(30));

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].topic_id, TopicId(10));
        assert!(pending[0].has_topic && !pending[0].has_post);
        assert_eq!(pending[0].age_secs, 30);
        assert_eq!(pending[1].topic_id, TopicId(20));
        assert!(!pending[1].has_topic && pending[1].has_post);
    }

    // ─── Concurrency ───

    #[test]
    fn concurrent_merges_complete_each_key_exactly_once() {
        const KEYS: u64 = 200;
        const THREADS: u64 = 8;

        let store = Arc::new(CorrelatorStore::new());
        let completions = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for thread in 0..THREADS {
                let store = Arc::clone(&store);
                let completions = Arc::clone(&completions);
                scope.spawn(move || {
                    for key in 0..KEYS {
                        // Every thread merges both halves, in an order that
                        // depends on the thread, so the halves race.
                        let snapshots = if (key + thread) % 2 == 0 {
                            [
                                store.merge_topic_half(TopicId(key), topic_half(key, "T", 1)),
                                store.merge_post_half(TopicId(key), post_half(key, 1, "p")),
                            ]
                        } else {
                            [
                                store.merge_post_half(TopicId(key), post_half(key, 1, "p")),
                                store.merge_topic_half(TopicId(key), topic_half(key, "T", 1)),
                            ]
                        };
                        for snapshot in snapshots {
                            if snapshot.completed_now {
                                completions.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                });
            }
        });

        assert_eq!(completions.load(Ordering::SeqCst), KEYS as usize);
        assert_eq!(store.len(), KEYS as usize);
    }

    #[test]
    fn concurrent_remove_and_sweep_do_not_conflict() {
        let store = Arc::new(CorrelatorStore::new());
        for key in 0..100 {
            store.merge_topic_half(TopicId(key), topic_half(key, "T", 1));
        }
        let far_future = Utc::now() + Duration::hours(1);

        std::thread::scope(|scope| {
            let remover = Arc::clone(&store);
            scope.spawn(move || {
                for key in 0..100 {
                    remover.remove(TopicId(key));
                }
            });
            let sweeper = Arc::clone(&store);
            scope.spawn(move || {
                sweeper.sweep_expired(Duration::zero(), far_future);
            });
        });

        assert!(store.is_empty());
    }

    proptest! {
        /// Completion does not depend on which half arrives first.
        #[test]
        fn completion_is_order_independent(id in 1u64..1_000_000, topic_first: bool) {
            let store = CorrelatorStore::new();
            let key = TopicId(id);

            let (first, second) = if topic_first {
                let a = store.merge_topic_half(key, topic_half(id, "T", 1));
                let b = store.merge_post_half(key, post_half(id, 1, "p"));
                (a, b)
            } else {
                let a = store.merge_post_half(key, post_half(id, 1, "p"));
                let b = store.merge_topic_half(key, topic_half(id, "T", 1));
                (a, b)
            };

            prop_assert!(!first.complete);
            prop_assert!(second.complete);
            prop_assert!(second.completed_now);
            prop_assert_eq!(first.created_at, second.created_at);
        }

        /// Repeated merges of one half never complete a record or add entries.
        #[test]
        fn single_half_never_completes(id in 1u64..1_000_000, repeats in 1usize..8) {
            let store = CorrelatorStore::new();
            for _ in 0..repeats {
                let snapshot = store.merge_post_half(TopicId(id), post_half(id, 1, "p"));
                prop_assert!(!snapshot.complete);
            }
            prop_assert_eq!(store.len(), 1);
        }
    }
}
