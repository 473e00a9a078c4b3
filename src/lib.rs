//! Forum Relay - correlates Discourse topic and first-post webhooks into one
//! Telegram notification per new topic.
//!
//! The core is the [`correlator`]: a keyed, time-bounded join of partial
//! records. [`ingest`] feeds it, [`notify`] drains it, and [`server`] exposes
//! it over HTTP.

pub mod config;
pub mod correlator;
pub mod ingest;
pub mod notify;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
