//! Telegram Bot API notifier.
//!
//! Sends each notification as one `sendMessage` call in HTML parse mode to a
//! fixed chat, routed to the request's forum thread when it has one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::channel::{DeliveryError, Notifier};
use super::format::{DEFAULT_PREMIUM_NOTICE, render_message};
use super::request::NotificationRequest;

/// Default Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// A Telegram client scoped to one destination chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    token: String,
    chat_id: i64,
    api_base: String,
    premium_notice: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, token: impl Into<String>, chat_id: i64) -> Self {
        TelegramNotifier {
            client,
            token: token.into(),
            chat_id,
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            premium_notice: DEFAULT_PREMIUM_NOTICE.to_string(),
        }
    }

    /// Overrides the footer used for premium categories.
    pub fn with_premium_notice(mut self, notice: impl Into<String>) -> Self {
        self.premium_notice = notice.into();
        self
    }

    /// Points the notifier at another Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Returns the destination chat.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }

    fn send_message_body(&self, request: &NotificationRequest) -> SendMessage {
        SendMessage {
            chat_id: self.chat_id,
            text: render_message(request, &self.premium_notice),
            parse_mode: "HTML",
            message_thread_id: request.thread_id.get(),
        }
    }
}

impl Notifier for TelegramNotifier {
    async fn deliver(&self, request: &NotificationRequest) -> Result<(), DeliveryError> {
        let body = self.send_message_body(request);

        debug!(
            topic_id = %request.topic_id,
            chat_id = self.chat_id,
            thread_id = ?body.message_thread_id,
            "Sending Telegram message"
        );

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        check_response(status.as_u16(), &text)
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct SendMessage {
    chat_id: i64,
    text: String,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Interprets a Bot API response.
///
/// The Bot API reports failures both through the HTTP status and through the
/// `ok` field, so both must be checked.
fn check_response(status: u16, body: &str) -> Result<(), DeliveryError> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();
    match parsed {
        Some(ApiResponse { ok: true, .. }) if (200..300).contains(&status) => Ok(()),
        Some(ApiResponse { description, .. }) => Err(DeliveryError::Rejected {
            status,
            description: description.unwrap_or_else(|| "no description".to_string()),
        }),
        None => Err(DeliveryError::Rejected {
            status,
            description: body.chars().take(200).collect(),
        }),
    }
}
