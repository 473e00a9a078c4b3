//! Telegram message text.
//!
//! Messages use Telegram's HTML parse mode, so every user-controlled string
//! (author, title, summary, tags) is escaped before interpolation.

use super::request::NotificationRequest;

/// Default footer appended to notifications from premium categories.
pub const DEFAULT_PREMIUM_NOTICE: &str =
    "💎 <b>This section is available to subscribers only.</b>";

/// Renders the message text for `request`.
///
/// `premium_notice` is trusted HTML from configuration and is appended
/// verbatim for premium categories.
///
/// # Example
///
/// ```text
/// 👤 🛡️ <b>alice</b> created a new topic: <b>Test</b>
///
/// 📋 The author says hello.
///
/// 🔗 <a href="https://forum.example.com/t/test/42">Open topic</a>
///
/// 🏷 Tags: #rust, #async
/// ```
pub fn render_message(request: &NotificationRequest, premium_notice: &str) -> String {
    let mut message = format!(
        "👤 {}<b>{}</b> created a new topic: <b>{}</b>\n\n\
         📋 {}\n\n\
         🔗 <a href=\"{}\">Open topic</a>\n\n\
         🏷 Tags: {}",
        request.author_role.badge(),
        escape_html(&request.author_display_name),
        escape_html(&request.topic_title),
        escape_html(&request.summary_text),
        escape_html(&request.permalink),
        format_tags(&request.tags),
    );

    if request.is_premium_category && !premium_notice.is_empty() {
        message.push_str("\n\n");
        message.push_str(premium_notice);
    }

    message
}

/// Formats tags as `#a, #b`, or `none`.
pub fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        return "none".to_string();
    }
    tags.iter()
        .map(|tag| format!("#{}", escape_html(tag)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escapes the characters Telegram's HTML mode treats specially.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
