//! Webhook handling for Discourse events.
//!
//! This module provides:
//! - Authentication of webhook requests (HMAC-SHA256 signature or query secret)
//! - Classification of payloads into typed topic/post events

pub mod events;
pub mod parser;
pub mod signature;

pub use events::ForumEvent;
pub use parser::{ClassifyError, classify};
pub use signature::{
    authenticate, compute_signature, format_signature_header, parse_signature_header,
    verify_query_secret, verify_signature,
};
