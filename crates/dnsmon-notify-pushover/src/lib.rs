// # Pushover Notifier
//
// Delivers dnsmon alerts as high-priority Pushover messages.
//
// ## Behavior
//
// - One form POST to `/1/messages.json` per alert
// - Any status other than 200 is an error carrying the status and body
// - No retries here: the monitor owns the notification retry policy
//
// ## Security
//
// The app token and user key never appear in logs or Debug output.
//
// ## API Reference
//
// - Pushover Message API: https://pushover.net/api

use async_trait::async_trait;
use dnsmon_core::config::NotifierConfig;
use dnsmon_core::traits::{Notifier, NotifierFactory};
use dnsmon_core::{ComponentRegistry, Error, Result};
use std::time::Duration;

/// Pushover API base URL
const PUSHOVER_API_BASE: &str = "https://api.pushover.net";

/// HTTP timeout for one delivery
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Message priority sent with every alert (high)
const PRIORITY: &str = "1";

/// Registry name of this notifier
pub const NOTIFIER_NAME: &str = "pushover";

pub struct PushoverNotifier {
    /// ⚠️ NEVER log this value
    app_token: String,

    /// ⚠️ NEVER log this value
    user_key: String,

    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("app_token", &"<REDACTED>")
            .field("user_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PushoverNotifier {
    /// Create a notifier posting to the public Pushover API
    ///
    /// Fails if either credential is empty.
    pub fn new(app_token: impl Into<String>, user_key: impl Into<String>) -> Result<Self> {
        let app_token = app_token.into();
        let user_key = user_key.into();

        if app_token.is_empty() || user_key.is_empty() {
            return Err(Error::config("Pushover app token and user key are required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            app_token,
            user_key,
            base_url: PUSHOVER_API_BASE.to_string(),
            client,
        })
    }

    /// Point the notifier at another API host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/1/messages.json", self.base_url)
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn send(&self, title: &str, message: &str) -> Result<()> {
        if title.is_empty() || message.is_empty() {
            return Err(Error::notifier(NOTIFIER_NAME, "title and message are required"));
        }

        let form = [
            ("token", self.app_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", title),
            ("message", message),
            ("priority", PRIORITY),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::notifier(NOTIFIER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::notifier(
                NOTIFIER_NAME,
                format!("non-OK response from Pushover: {} - {}", status.as_u16(), body),
            ));
        }

        tracing::debug!(title, "Pushover message accepted");
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        NOTIFIER_NAME
    }
}

/// Factory for creating Pushover notifiers
pub struct PushoverFactory;

impl NotifierFactory for PushoverFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Pushover {
                app_token,
                user_key,
            } => Ok(Box::new(PushoverNotifier::new(
                app_token.clone(),
                user_key.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Pushover notifier")),
        }
    }
}

/// Register the Pushover notifier with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier(NOTIFIER_NAME, Box::new(PushoverFactory));
}
