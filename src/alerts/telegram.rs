//! Telegram Bot API integration.
//!
//! `TelegramNotifier` posts alerts to a chat via `sendMessage`. When the bot
//! token or chat id is missing it degrades to logging the alert.
//!
//! `TelegramTradeRelay` requests trades by posting a chat-bot command
//! (`"{prefix} {command} {symbol}"`) to the same chat, where a trading bot
//! picks it up.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{Notifier, TradeRelay};

const API_BASE: &str = "https://api.telegram.org";

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

pub struct TelegramNotifier {
    http: Client,
    credentials: Option<(SecretString, String)>,
}

impl TelegramNotifier {
    /// Build a notifier. Passing `None` for either value disables delivery.
    pub fn new(bot_token: Option<SecretString>, chat_id: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        let credentials = match (bot_token, chat_id) {
            (Some(token), Some(chat)) if !token.expose_secret().is_empty() && !chat.is_empty() => {
                Some((token, chat))
            }
            _ => None,
        };

        if credentials.is_none() {
            info!("Telegram credentials not configured, alerts will only be logged");
        }

        Ok(Self { http, credentials })
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    async fn send_message(&self, token: &SecretString, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendMessage", token.expose_secret());

        let resp = self
            .http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .context("Telegram request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error {status}: {body}");
        }

        debug!(chat_id, "Telegram message sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        match &self.credentials {
            Some((token, chat_id)) => self.send_message(token, chat_id, message).await,
            None => {
                info!(alert = message, "Alert (Telegram disabled)");
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Trade relay
// ---------------------------------------------------------------------------

pub struct TelegramTradeRelay {
    notifier: Arc<dyn Notifier>,
    command_prefix: String,
    trade_command: String,
    enabled: bool,
}

impl TelegramTradeRelay {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        command_prefix: &str,
        trade_command: &str,
        enabled: bool,
    ) -> Self {
        Self {
            notifier,
            command_prefix: command_prefix.to_string(),
            trade_command: trade_command.to_string(),
            enabled,
        }
    }

    /// The chat-bot command for trading `symbol`.
    pub fn command_for(&self, symbol: &str) -> String {
        format!("{} {} {}", self.command_prefix, self.trade_command, symbol)
    }
}

#[async_trait]
impl TradeRelay for TelegramTradeRelay {
    async fn request_trade(&self, symbol: &str) -> Result<()> {
        let command = self.command_for(symbol);

        if !self.enabled {
            info!(command = %command, "[DRY RUN] Would request trade");
            return Ok(());
        }

        info!(command = %command, "Requesting trade");
        self.notifier
            .notify(&format!("Executing trade command: {command}"))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
