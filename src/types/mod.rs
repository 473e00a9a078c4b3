//! Core domain types for the forum relay.
//!
//! Identifiers, the two record halves, and author roles. Everything else in
//! the crate is built on these.

pub mod half;
pub mod ids;
pub mod role;

// Re-export commonly used types at the module level
pub use half::{AuthorFlags, PostHalf, TopicHalf};
pub use ids::{CategoryId, PostId, ThreadId, TopicId, UserId};
pub use role::AuthorRole;
