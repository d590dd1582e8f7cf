// src/notify/pushplus.rs
use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Channel;
use crate::config::PushPlusConfig;
use crate::report::Report;

/// Upper bound on send attempts.
const MAX_ATTEMPTS: u8 = 5;

/// Chat push through the PushPlus HTTP API.
#[derive(Clone)]
pub struct PushPlusChannel {
    endpoint: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl PushPlusChannel {
    pub fn new(cfg: &PushPlusConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            token: cfg.token.clone(),
            client: Client::new(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_retries: cfg.max_retries.clamp(1, MAX_ATTEMPTS),
        }
    }

    async fn post_once(&self, payload: &PushPlusPayload<'_>) -> Result<()> {
        let rsp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| anyhow!("pushplus request failed: {e}"))?;
        let rsp = rsp
            .error_for_status()
            .map_err(|e| anyhow!("pushplus HTTP error: {e}"))?;
        let body: PushPlusResponse = rsp
            .json()
            .await
            .map_err(|e| anyhow!("pushplus response unreadable: {e}"))?;
        check_response(&body)
    }
}

#[async_trait::async_trait]
impl Channel for PushPlusChannel {
    fn name(&self) -> &str {
        "pushplus"
    }

    async fn send(&self, report: &Report) -> Result<()> {
        let payload = PushPlusPayload {
            token: &self.token,
            title: &report.title,
            content: &report.html,
            template: "html",
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match self.post_once(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = %e, "pushplus retry");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Serialize)]
struct PushPlusPayload<'a> {
    token: &'a str,
    title: &'a str,
    content: &'a str,
    template: &'a str,
}

#[derive(Debug, Deserialize)]
struct PushPlusResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
}

fn check_response(body: &PushPlusResponse) -> Result<()> {
    if body.code == 200 {
        return Ok(());
    }
    bail!(
        "pushplus rejected message: code {} ({})",
        body.code,
        body.msg.as_deref().unwrap_or("no message")
    )
}
