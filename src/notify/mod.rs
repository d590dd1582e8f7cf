// src/notify/mod.rs
//! Delivery channels and the fan-out that judges a batch delivered when at
//! least one channel succeeds.

pub mod email;
pub mod pushplus;
pub mod webhook;

use anyhow::Result;
use metrics::counter;
use std::sync::Mutex;

use crate::report::Report;

#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;
    /// Deliver one report. Errors stay inside [`deliver`].
    async fn send(&self, report: &Report) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub ok: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutResult {
    pub outcomes: Vec<ChannelOutcome>,
}

impl FanoutResult {
    /// At least one channel succeeded. An empty channel set never delivers.
    pub fn delivered(&self) -> bool {
        self.outcomes.iter().any(|o| o.ok)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChannelOutcome> {
        self.outcomes.iter().filter(|o| !o.ok)
    }
}

/// Try every channel in order, without short-circuiting.
pub async fn deliver(report: &Report, channels: &[Box<dyn Channel>]) -> FanoutResult {
    let mut result = FanoutResult::default();
    for ch in channels {
        counter!("price_watch_channel_attempts_total").increment(1);
        let outcome = match ch.send(report).await {
            Ok(()) => {
                tracing::info!(channel = ch.name(), "report delivered");
                ChannelOutcome {
                    channel: ch.name().to_string(),
                    ok: true,
                    reason: None,
                }
            }
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(channel = ch.name(), error = %reason, "channel failed");
                counter!("price_watch_channel_failures_total").increment(1);
                ChannelOutcome {
                    channel: ch.name().to_string(),
                    ok: false,
                    reason: Some(reason),
                }
            }
        };
        result.outcomes.push(outcome);
    }
    if channels.is_empty() {
        tracing::warn!("no channels configured; nothing can be delivered");
    }
    result
}

// --- Test helper ---
/// Scripted channel: succeeds or fails on every call and records report titles.
pub struct MockChannel {
    name: String,
    succeed: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new(name: &str, succeed: bool) -> Self {
        Self {
            name: name.to_string(),
            succeed,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, report: &Report) -> Result<()> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(report.title.clone());
        }
        if self.succeed {
            Ok(())
        } else {
            anyhow::bail!("{} unavailable", self.name)
        }
    }
}

#[async_trait::async_trait]
impl<C: Channel + ?Sized> Channel for std::sync::Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send(&self, report: &Report) -> Result<()> {
        (**self).send(report).await
    }
}
