//! Background eviction of stale partial records.
//!
//! The sweeper alternates between two states: idle (waiting on the next tick)
//! and sweeping (one `sweep_expired` pass under the store's write lock). It has
//! no terminal state of its own and runs until its shutdown token fires.
//!
//! Staleness is bounded by `interval + ttl`: an entry created just after a
//! sweep is evicted at the first tick after its age exceeds the TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::{CorrelatorStore, SweepReport};

/// Default maximum age of a partial record (5 minutes).
pub const DEFAULT_RECORD_TTL_SECS: u64 = 300;

/// Default interval between sweeps (1 minute).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Timing for the eviction sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweep passes. Should be shorter than `ttl`.
    pub interval: Duration,

    /// Maximum age of an entry, measured from its creation.
    pub ttl: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        SweeperConfig {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            ttl: Duration::from_secs(DEFAULT_RECORD_TTL_SECS),
        }
    }
}

/// Periodically evicts expired entries from a [`CorrelatorStore`].
pub struct Sweeper {
    store: Arc<CorrelatorStore>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(store: Arc<CorrelatorStore>, config: SweeperConfig) -> Self {
        Sweeper { store, config }
    }

    /// Runs a single sweep pass against the current time.
    pub fn sweep_once(&self) -> SweepReport {
        // Durations beyond chrono's range are effectively "never expire".
        let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::MAX);
        let report = self.store.sweep_expired(ttl, Utc::now());

        if report.removed > 0 {
            debug!(
                removed = report.removed,
                remaining = self.store.len(),
                "Evicted expired partial records"
            );
        }
        for topic_id in &report.removed_complete {
            warn!(
                topic_id = %topic_id,
                "Evicted a complete record; its dispatch never removed it"
            );
        }

        report
    }

    /// Sweeps on every tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            ttl_secs = self.config.ttl.as_secs_f64(),
            "Sweeper started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can be stale yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping sweeper");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }
    }

    /// Spawns [`Sweeper::run`] as a tokio task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{post_half, topic_half};
    use crate::types::TopicId;

    fn fast_config(ttl: Duration) -> SweeperConfig {
        SweeperConfig {
            interval: Duration::from_millis(10),
            ttl,
        }
    }

    #[test]
    fn default_config_sweeps_more_often_than_ttl() {
        let config = SweeperConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert!(config.interval < config.ttl);
    }

    #[test]
    fn sweep_once_keeps_fresh_entries() {
        let store = Arc::new(CorrelatorStore::new());
        store.merge_post_half(TopicId(1), post_half(1, 1, "p"));

        let sweeper = Sweeper::new(Arc::clone(&store), SweeperConfig::default());
        let report = sweeper.sweep_once();

        assert_eq!(report.removed, 0);
        assert!(store.contains(TopicId(1)));
    }

    #[test]
    fn sweep_once_evicts_and_reports_complete_entries() {
        let store = Arc::new(CorrelatorStore::new());
        store.merge_topic_half(TopicId(1), topic_half(1, "T", 1));
        store.merge_post_half(TopicId(1), post_half(1, 1, "p"));
        std::thread::sleep(Duration::from_millis(5));

        let sweeper = Sweeper::new(Arc::clone(&store), fast_config(Duration::ZERO));
        let report = sweeper.sweep_once();

        assert_eq!(report.removed, 1);
        assert_eq!(report.removed_complete, vec![TopicId(1)]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn background_task_evicts_orphaned_half() {
        let store = Arc::new(CorrelatorStore::new());
        store.merge_post_half(TopicId(99), post_half(99, 1, "orphan"));

        let shutdown = CancellationToken::new();
        let handle =
            Sweeper::new(Arc::clone(&store), fast_config(Duration::ZERO)).spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!store.contains(TopicId(99)));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn background_task_stops_on_shutdown() {
        let store = Arc::new(CorrelatorStore::new());
        let shutdown = CancellationToken::new();
        let handle = Sweeper::new(store, SweeperConfig::default()).spawn(shutdown.clone());

        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop promptly")
            .unwrap();
    }
}
