// src/services/notifier.rs
//
// Delivery of lead notifications to the sales team's Telegram chat.
// The notifier is optional: without TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID it
// reports itself as unconfigured and every send fails with `NotConfigured`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel is not configured")]
    NotConfigured,

    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification API answered {status}: {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait LeadNotifier: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Sends an HTML-formatted message.
    async fn send(&self, html: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    parse_mode: &'static str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.filter(|t| !t.trim().is_empty()),
            chat_id: chat_id.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Points the client at another Bot API host (self-hosted server, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LeadNotifier for TelegramNotifier {
    fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn send(&self, html: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            error!("Telegram env is not configured");
            return Err(NotifyError::NotConfigured);
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: chat_id.as_str(),
                parse_mode: "HTML",
                text: html,
                disable_web_page_preview: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "telegram_error".to_string());
            error!(status = status.as_u16(), body = %body, "Telegram API error");
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!("lead notification delivered to Telegram");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credentials_count_as_unconfigured() {
        let notifier = TelegramNotifier::new(Some("  ".into()), Some("42".into()));
        assert!(!notifier.is_configured());

        let notifier = TelegramNotifier::new(Some("token".into()), Some("42".into()));
        assert!(notifier.is_configured());
    }

    #[tokio::test]
    async fn sending_without_credentials_fails_fast() {
        let notifier = TelegramNotifier::new(None, None);
        assert!(matches!(
            notifier.send("<b>hi</b>").await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let notifier = TelegramNotifier::new(Some("token".into()), Some("42".into()))
            .with_api_base("http://127.0.0.1:9/");
        assert!(matches!(
            notifier.send("hi").await,
            Err(NotifyError::Transport(_))
        ));
    }
}
