//! Service configuration from environment variables.
//!
//! Required: `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`, `WEBHOOK_SECRET`.
//! Everything else has a default. An empty variable counts as unset.
//!
//! Category and user lists (`PREMIUM_CATEGORIES`, `MONITORED_CATEGORIES`,
//! `IGNORED_CATEGORIES`, `IGNORED_USERS`) are comma-separated and lenient:
//! entries that are not integers are skipped. Everything else is strict.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::correlator::SweeperConfig;
use crate::correlator::sweeper::{DEFAULT_RECORD_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS};
use crate::ingest::{DEFAULT_LEADER_TRUST_LEVEL, Policy};
use crate::notify::DispatchSettings;
use crate::notify::dispatcher::{DEFAULT_DELIVERY_TIMEOUT_SECS, DEFAULT_SUMMARY_TIMEOUT_SECS};
use crate::notify::format::DEFAULT_PREMIUM_NOTICE;
use crate::notify::summary::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::types::{CategoryId, ThreadId, UserId};

/// Number of `TELEGRAM_THREAD_ID_<n>` / `THREAD_CATEGORIES_<n>` pairs read.
pub const THREAD_MAPPING_SLOTS: usize = 5;

pub const DEFAULT_WEBHOOK_PORT: u16 = 8080;
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
pub const DEFAULT_BASE_URL: &str = "https://your-forum.com";

/// Errors from loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {name}: {value:?} is not a valid {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: &'static str,
    },

    #[error("invalid category id {value:?} in {name}")]
    InvalidCategory { name: String, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error(
        "SWEEP_INTERVAL_SECS ({interval_secs}) must be shorter than RECORD_TTL_SECS ({ttl_secs})"
    )]
    SweepNotShorterThanTtl { interval_secs: u64, ttl_secs: u64 },

    #[error("WEBHOOK_PATH must start with '/': {0:?}")]
    InvalidPath(String),
}

/// Telegram destination.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub premium_notice: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

/// Chat-completion settings. Absent when `OPENAI_API_KEY` is unset.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Inbound webhook endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub secret: String,
    pub port: u16,
    pub path: String,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("port", &self.port)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Everything the service needs at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub openai: Option<OpenAiConfig>,

    pub webhook: WebhookConfig,

    /// Public forum URL for permalinks.
    pub base_url: String,

    pub policy: Policy,

    pub record_ttl: Duration,
    pub sweep_interval: Duration,
    pub delivery_timeout: Duration,
    pub summary_timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let telegram = TelegramConfig {
            bot_token: env.required("TELEGRAM_BOT_TOKEN")?,
            chat_id: env.required_parsed("TELEGRAM_CHAT_ID", "integer")?,
            premium_notice: env
                .get("PREMIUM_NOTICE")
                .unwrap_or_else(|| DEFAULT_PREMIUM_NOTICE.to_string()),
        };

        let webhook = WebhookConfig {
            secret: env.required("WEBHOOK_SECRET")?,
            port: env.parsed_or("WEBHOOK_PORT", "port number", DEFAULT_WEBHOOK_PORT)?,
            path: env
                .get("WEBHOOK_PATH")
                .unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string()),
        };
        if !webhook.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(webhook.path));
        }

        let openai = env.get("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: env
                .get("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: env
                .get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        });

        let policy = Policy {
            ignored_users: env.lenient_list("IGNORED_USERS").into_iter().map(UserId).collect(),
            ignored_categories: env.category_list("IGNORED_CATEGORIES"),
            monitored_categories: env.category_list("MONITORED_CATEGORIES"),
            premium_categories: env.category_list("PREMIUM_CATEGORIES"),
            category_threads: env.category_threads()?,
            default_thread: ThreadId(env.parsed_or("TELEGRAM_THREAD_ID", "integer", 0)?),
            leader_trust_level: env.parsed_or(
                "LEADER_TRUST_LEVEL",
                "trust level",
                DEFAULT_LEADER_TRUST_LEVEL,
            )?,
        };

        let record_ttl_secs = env.positive_secs("RECORD_TTL_SECS", DEFAULT_RECORD_TTL_SECS)?;
        let sweep_interval_secs =
            env.positive_secs("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval_secs >= record_ttl_secs {
            return Err(ConfigError::SweepNotShorterThanTtl {
                interval_secs: sweep_interval_secs,
                ttl_secs: record_ttl_secs,
            });
        }

        Ok(Config {
            telegram,
            openai,
            webhook,
            base_url: env
                .get("BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            policy,
            record_ttl: Duration::from_secs(record_ttl_secs),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            delivery_timeout: Duration::from_secs(
                env.positive_secs("DELIVERY_TIMEOUT_SECS", DEFAULT_DELIVERY_TIMEOUT_SECS)?,
            ),
            summary_timeout: Duration::from_secs(
                env.positive_secs("SUMMARY_TIMEOUT_SECS", DEFAULT_SUMMARY_TIMEOUT_SECS)?,
            ),
        })
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            interval: self.sweep_interval,
            ttl: self.record_ttl,
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            base_url: self.base_url.clone(),
            delivery_timeout: self.delivery_timeout,
            summary_timeout: self.summary_timeout,
        }
    }
}

/// Typed access to a variable lookup.
struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn required_parsed<T: FromStr>(
        &self,
        name: &'static str,
        expected: &'static str,
    ) -> Result<T, ConfigError> {
        let value = self.required(name)?;
        parse(name, value, expected)
    }

    fn parsed_or<T: FromStr>(
        &self,
        name: &str,
        expected: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => parse(name, value, expected),
            None => Ok(default),
        }
    }

    fn positive_secs(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let secs = self.parsed_or(name, "number of seconds", default)?;
        if secs == 0 {
            return Err(ConfigError::Zero { name });
        }
        Ok(secs)
    }

    /// Comma-separated integers; malformed entries are skipped.
    fn lenient_list<T: FromStr>(&self, name: &str) -> Vec<T> {
        self.get(name)
            .map(|value| {
                value
                    .split(',')
                    .filter_map(|entry| entry.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn category_list<C: FromIterator<CategoryId>>(&self, name: &str) -> C {
        self.lenient_list(name).into_iter().map(CategoryId).collect()
    }

    /// Reads the numbered thread slots. A slot is used only when both its
    /// thread id and its category list are set; later slots override earlier
    /// ones for the same category.
    fn category_threads(&self) -> Result<HashMap<CategoryId, ThreadId>, ConfigError> {
        let mut threads = HashMap::new();

        for slot in 1..=THREAD_MAPPING_SLOTS {
            let thread_key = format!("TELEGRAM_THREAD_ID_{}", slot);
            let categories_key = format!("THREAD_CATEGORIES_{}", slot);

            let (Some(thread), Some(categories)) =
                (self.get(&thread_key), self.get(&categories_key))
            else {
                continue;
            };

            let thread = ThreadId(parse(&thread_key, thread, "integer")?);
            for entry in categories.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let category = entry.parse().map_err(|_| ConfigError::InvalidCategory {
                    name: categories_key.clone(),
                    value: entry.to_string(),
                })?;
                threads.insert(CategoryId(category), thread);
            }
        }

        Ok(threads)
    }
}

fn parse<T: FromStr>(name: &str, value: String, expected: &'static str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name: name.to_string(),
        value,
        expected,
    })
}
