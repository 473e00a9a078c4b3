//! Time-bounded join of topic and first-post halves.
//!
//! # Module Structure
//!
//! - [`store`]: the keyed partial-record table and its merge/remove/sweep operations
//! - [`sweeper`]: the background task that evicts stale entries

pub mod store;
pub mod sweeper;

pub use store::{CompleteRecord, CorrelatorStore, PendingSummary, RecordSnapshot, SweepReport};
pub use sweeper::{Sweeper, SweeperConfig};
