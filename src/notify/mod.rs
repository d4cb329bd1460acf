//! Telegram notification module
//!
//! Sends formatted token alerts to a Telegram chat.

pub mod templates;


use crate::error::{BotError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outbound "send text message" operation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Telegram settings (optional section)
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: usize,
}

fn default_max_per_minute() -> usize {
    20
}

/// Sliding one-minute window
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(max: usize) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Take a slot if one is free
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut sent = self.sent.lock();
        while sent
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            sent.pop_front();
        }

        if sent.len() >= self.max_per_window {
            return false;
        }
        sent.push_back(now);
        true
    }

    /// Slots used in the current window
    pub fn in_window(&self) -> usize {
        self.sent.lock().len()
    }
}

/// Telegram notifier
pub struct Notifier {
    http: Client,
    bot_token: String,
    chat_id: String,
    enabled: bool,
    limiter: RateLimiter,
}

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

impl Notifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            http: Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            enabled: true,
            limiter: RateLimiter::per_minute(config.max_per_minute),
        }
    }

    /// Create a disabled notifier (for when Telegram is not configured)
    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            bot_token: String::new(),
            chat_id: String::new(),
            enabled: false,
            limiter: RateLimiter::per_minute(default_max_per_minute()),
        }
    }

    pub fn from_config(config: Option<&TelegramConfig>) -> Self {
        config.map(Self::new).unwrap_or_else(Self::disabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send a raw message (HTML format)
    pub async fn send(&self, text: &str) -> Result<()> {
        if !self.enabled {
            debug!("Telegram disabled, alert not sent");
            return Ok(());
        }

        if !self.limiter.try_acquire() {
            warn!("Telegram rate limit reached, alert dropped");
            return Ok(());
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        let msg = TelegramMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.http.post(&url).json(&msg).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BotError::Notify(format!("Telegram send failed ({}): {}", status, error_text)));
        }

        Ok(())
    }
}

#[async_trait]
impl AlertSink for Notifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.send(text).await
    }
}
