//! Short synopses of new topics via a chat-completion API.
//!
//! Summaries are decoration: every failure here (no API key, timeout, HTTP
//! error, empty answer) degrades to [`super::request::FALLBACK_SUMMARY`]
//! instead of failing the notification.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::AuthorRole;

/// Default chat-completion endpoint base.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

const MAX_TOKENS: u32 = 100;
const TEMPERATURE: f64 = 0.2;

/// Input for a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    /// Raw post content.
    pub content: String,
    pub title: String,
    pub author_role: AuthorRole,
    pub category: String,
}

/// Errors from generating a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// No summarizer is configured.
    #[error("summarizer disabled")]
    Disabled,

    #[error("summary timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered without any usable text.
    #[error("completion API returned no text")]
    EmptyResponse,
}

/// Produces a short synopsis of a post.
pub trait Summarizer {
    fn summarize(
        &self,
        request: &SummaryRequest,
    ) -> impl Future<Output = Result<String, SummaryError>> + Send;
}

/// An absent summarizer always reports [`SummaryError::Disabled`].
impl<S: Summarizer + Sync> Summarizer for Option<S> {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
        match self {
            Some(summarizer) => summarizer.summarize(request).await,
            None => Err(SummaryError::Disabled),
        }
    }
}

/// Summarizer backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiSummarizer {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// Points the summarizer at another compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn completion_request(&self, request: &SummaryRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.completion_request(request);

        debug!(model = %self.model, title = %request.title, "Requesting summary");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummaryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        first_choice_text(completion)
    }
}

impl std::fmt::Debug for OpenAiSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSummarizer")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn first_choice_text(completion: ChatCompletionResponse) -> Result<String, SummaryError> {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(SummaryError::EmptyResponse)
}

/// Strips the paragraph and line-break markup Discourse leaves in content.
fn clean_content(content: &str) -> String {
    content
        .replace("<p>", "")
        .replace("</p>", "")
        .replace("<br>", " ")
        .trim()
        .to_string()
}

fn build_prompt(request: &SummaryRequest) -> String {
    format!(
        "You summarize posts from a technical forum for a chat channel.\n\
         \n\
         Topic title: \"{title}\"\n\
         Category: {category}\n\
         Author role: {role}\n\
         \n\
         Post content:\n\
         {content}\n\
         \n\
         Describe what the author actually wrote in this post, not the topic in general, \
         in at most two sentences. If the author asks a question, say what they ask about; \
         if they propose a solution or share an opinion, say so. If the post is a test message \
         or meaningless text, say that plainly. Do not repeat the title or mention the author's role.\n\
         \n\
         Summary:",
        title = request.title,
        category = request.category,
        role = request.author_role,
        content = clean_content(&request.content),
    )
}
