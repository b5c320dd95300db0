//! # notifier — ส่งข้อความแจ้ง Operator
//!
//! A failed delivery is reported as [`BotError::Notification`]; the
//! orchestrator logs it and carries on.  Trading never waits on chat.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::error::BotError;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), BotError>;
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

pub struct TelegramNotifier {
    client:   reqwest::Client,
    config:   TelegramConfig,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        Self {
            client,
            config,
            base_url: "https://api.telegram.org".to_string(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), BotError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.config.bot_token);

        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text":    text,
                "disable_web_page_preview": true,
            }))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            // ตัด URL ออก เพราะมี bot token อยู่ในนั้น
            .map_err(|e| BotError::Notification(format!("telegram unreachable: {}", e.without_url())))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(BotError::Notification(format!("telegram HTTP {status}: {body}")));
        }

        Ok(())
    }
}

// ─── Log-only ─────────────────────────────────────────────────────────────────

/// Used when no chat is configured.  Messages go to the log and never fail.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<(), BotError> {
        info!(message = %text, "📣 [NOTIFY]");
        Ok(())
    }
}

/// Telegram when configured, log-only otherwise.
pub fn from_config(client: reqwest::Client, telegram: Option<TelegramConfig>) -> Box<dyn Notifier> {
    match telegram {
        Some(config) => Box::new(TelegramNotifier::new(client, config)),
        None => {
            warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set — notifications go to the log only");
            Box::new(LogNotifier)
        }
    }
}
