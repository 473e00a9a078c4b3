//! The outbound notification boundary.
//!
//! The dispatcher hands a fully-built [`NotificationRequest`] to a
//! [`Notifier`]. The correlator never sees the chat platform.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use super::request::NotificationRequest;

/// Errors from delivering a notification.
///
/// Delivery failures are reported, never retried: the record is dropped
/// either way.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The notifier did not finish within the delivery timeout.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure (connect, TLS, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The chat platform answered but refused the message.
    #[error("chat API rejected the message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Delivers notifications to a chat channel.
///
/// # Example (recording notifier for tests)
///
/// ```ignore
/// struct Recording(Mutex<Vec<NotificationRequest>>);
///
/// impl Notifier for Recording {
///     async fn deliver(&self, request: &NotificationRequest) -> Result<(), DeliveryError> {
///         self.0.lock().unwrap().push(request.clone());
///         Ok(())
///     }
/// }
/// ```
pub trait Notifier {
    /// Sends one notification.
    fn deliver(
        &self,
        request: &NotificationRequest,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}
