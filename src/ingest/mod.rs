//! Inbound side of the relay.
//!
//! # Module Structure
//!
//! - [`policy`]: which events are relayed and where their notifications go
//! - [`gate`]: classification, filtering, merging, and dispatch triggering

pub mod gate;
pub mod policy;


pub use gate::{IngestError, IngestOutcome, IngestionGate, SkipReason};
pub use policy::{DEFAULT_LEADER_TRUST_LEVEL, Policy};
