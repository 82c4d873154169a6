// # Telegram Notifier
//
// Delivers dnsmon alerts through a Telegram bot to one or more chats.
//
// ## Behavior
//
// - One `sendMessage` call per configured chat, in order
// - Text is the title and message separated by a newline
// - The alert fails if any chat fails; remaining chats are still attempted
// - No retries here: the monitor owns the notification retry policy
// - A repeated send of the same text skips chats that already received it,
//   so a retried alert reaches each chat once
//
// ## Security
//
// The bot token is part of the request path. It never appears in logs,
// Debug output or error messages (request errors are stripped of their URL).
//
// ## API Reference
//
// - Telegram Bot API: https://core.telegram.org/bots/api#sendmessage

use async_trait::async_trait;
use dnsmon_core::config::NotifierConfig;
use dnsmon_core::traits::{Notifier, NotifierFactory};
use dnsmon_core::{ComponentRegistry, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Telegram Bot API base URL
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// HTTP timeout for one request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Registry name of this notifier
pub const NOTIFIER_NAME: &str = "telegram";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    /// ⚠️ NEVER log this value
    bot_token: String,

    chat_ids: Vec<i64>,

    base_url: String,

    client: reqwest::Client,

    /// Chats that already received the alert text currently being delivered
    delivered: Mutex<Option<(String, HashSet<i64>)>>,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<REDACTED>")
            .field("chat_ids", &self.chat_ids)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier for the given bot and chats
    ///
    /// Fails if the token is empty or no chat is given.
    pub fn new(bot_token: impl Into<String>, chat_ids: Vec<i64>) -> Result<Self> {
        let bot_token = bot_token.into();

        if bot_token.is_empty() {
            return Err(Error::config("Telegram bot token is required"));
        }
        if chat_ids.is_empty() {
            return Err(Error::config("At least one Telegram chat id is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            chat_ids,
            base_url: TELEGRAM_API_BASE.to_string(),
            client,
            delivered: Mutex::new(None),
        })
    }

    /// Point the notifier at another API host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn chat_ids(&self) -> &[i64] {
        &self.chat_ids
    }

    /// Chats still waiting for `text`
    ///
    /// A different text starts a new delivery.
    fn pending_chats(&self, text: &str) -> Vec<i64> {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        match delivered.as_ref() {
            Some((current, done)) if current == text => self
                .chat_ids
                .iter()
                .copied()
                .filter(|chat_id| !done.contains(chat_id))
                .collect(),
            _ => {
                *delivered = Some((text.to_string(), HashSet::new()));
                self.chat_ids.clone()
            }
        }
    }

    fn mark_delivered(&self, text: &str, chat_id: i64) {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((current, done)) = delivered.as_mut() {
            if current == text {
                done.insert(chat_id);
            }
        }
    }

    fn finish_delivery(&self, text: &str) {
        let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if delivered.as_ref().is_some_and(|(current, _)| current == text) {
            *delivered = None;
        }
    }

    async fn send_to(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .map_err(|e| {
                Error::notifier(
                    NOTIFIER_NAME,
                    format!("HTTP request failed: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        let accepted = serde_json::from_str::<ApiResponse>(&body)
            .map(|r| r.ok)
            .unwrap_or(false);

        if !status.is_success() || !accepted {
            let reason = serde_json::from_str::<ApiResponse>(&body)
                .ok()
                .and_then(|r| r.description)
                .unwrap_or(body);
            return Err(Error::notifier(
                NOTIFIER_NAME,
                format!("chat {}: {} - {}", chat_id, status.as_u16(), reason),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<()> {
        let text = format!("{}\n{}", title, message);

        let pending = self.pending_chats(&text);
        if pending.len() < self.chat_ids.len() {
            tracing::debug!(
                pending = pending.len(),
                chats = self.chat_ids.len(),
                "Resuming Telegram delivery"
            );
        }

        let mut failures = Vec::new();
        for chat_id in pending {
            match self.send_to(chat_id, &text).await {
                Ok(()) => self.mark_delivered(&text, chat_id),
                Err(e) => {
                    tracing::warn!(chat_id, error = %e, "Telegram delivery failed");
                    failures.push(e.to_string());
                }
            }
        }

        if failures.is_empty() {
            self.finish_delivery(&text);
            tracing::debug!(title, chats = self.chat_ids.len(), "Telegram message delivered");
            Ok(())
        } else {
            Err(Error::notifier(
                NOTIFIER_NAME,
                format!(
                    "{} of {} chats failed: {}",
                    failures.len(),
                    self.chat_ids.len(),
                    failures.join("; ")
                ),
            ))
        }
    }

    fn notifier_name(&self) -> &'static str {
        NOTIFIER_NAME
    }
}

/// Factory for creating Telegram notifiers
pub struct TelegramFactory;

impl NotifierFactory for TelegramFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Telegram {
                bot_token,
                chat_ids,
            } => Ok(Box::new(TelegramNotifier::new(
                bot_token.clone(),
                chat_ids.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Telegram notifier")),
        }
    }
}

/// Register the Telegram notifier with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier(NOTIFIER_NAME, Box::new(TelegramFactory));
}
