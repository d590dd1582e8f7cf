// src/notify/webhook.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::Channel;
use crate::config::WebhookConfig;
use crate::report::Report;

/// Slack-compatible incoming webhook (`{"text": ...}`).
pub struct WebhookChannel {
    url: String,
    client: Client,
    timeout: Duration,
}

impl WebhookChannel {
    pub fn new(cfg: &WebhookConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            client: Client::new(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[async_trait::async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        let body = serde_json::json!({ "text": report.text });

        self.client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }
}
