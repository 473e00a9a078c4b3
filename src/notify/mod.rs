//! Outbound side of the relay: from a completed record to a chat message.
//!
//! # Module Structure
//!
//! - [`channel`]: the [`Notifier`] boundary and its error type
//! - [`request`]: building a [`NotificationRequest`] from a completed record
//! - [`format`]: Telegram HTML message text
//! - [`telegram`]: the Bot API notifier
//! - [`summary`]: the [`Summarizer`] boundary and the chat-completion client
//! - [`dispatcher`]: summarize, deliver, remove

pub mod channel;
pub mod dispatcher;
pub mod format;
pub mod request;
pub mod summary;
pub mod telegram;

pub use channel::{DeliveryError, Notifier};
pub use dispatcher::{CompletionDispatcher, DispatchSettings};
pub use format::render_message;
pub use request::{FALLBACK_SUMMARY, NotificationRequest};
pub use summary::{OpenAiSummarizer, SummaryError, SummaryRequest, Summarizer};
pub use telegram::TelegramNotifier;
