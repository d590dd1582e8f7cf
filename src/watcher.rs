// src/watcher.rs
//! One scheduled run: fetch, partition, detect novelty, gate, notify, commit.

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, Utc};
use metrics::counter;
use std::collections::HashMap;

use crate::commit::commit;
use crate::config::AppConfig;
use crate::gate::{GateVerdict, TaskDescriptor, TaskMode, TaskPolicy};
use crate::ingest::table::HttpTableProvider;
use crate::ingest::{fetch_source, types::SourceProvider};
use crate::notify::email::EmailChannel;
use crate::notify::pushplus::PushPlusChannel;
use crate::notify::webhook::WebhookChannel;
use crate::notify::{deliver, Channel};
use crate::novelty::mark_novelty;
use crate::partition::partition_with_limit;
use crate::record::PriceRecord;
use crate::report::{render, Section};
use crate::state::{PeriodState, StateStore};
use crate::sync::{GitSync, NoopSync, PersistenceSync};
use crate::telemetry::ensure_metrics_described;

/// Calendar date of the reference clock.
pub fn reference_date(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Already completed this period.
    Closed,
    Suppressed { by: String },
    /// Gate open, but nothing warranted a report.
    Quiet { current: usize, new: usize },
    /// Every channel failed; state left untouched.
    Undelivered { failed: Vec<String> },
    Delivered {
        current: usize,
        new: usize,
        failed_channels: Vec<String>,
        committed: bool,
        synced: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub period: NaiveDate,
    pub tasks: Vec<(String, TaskOutcome)>,
}

impl RunSummary {
    pub fn outcome(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|(id, _)| id == task_id).map(|(_, o)| o)
    }

    pub fn delivered(&self) -> usize {
        self.tasks
            .iter()
            .filter(|(_, o)| matches!(o, TaskOutcome::Delivered { .. }))
            .count()
    }
}

pub struct Watcher {
    policy: TaskPolicy,
    providers: Vec<Box<dyn SourceProvider>>,
    channels: Vec<Box<dyn Channel>>,
    sync: Box<dyn PersistenceSync>,
    store: StateStore,
    prior_sample: usize,
}

impl Watcher {
    pub fn new(
        policy: TaskPolicy,
        providers: Vec<Box<dyn SourceProvider>>,
        channels: Vec<Box<dyn Channel>>,
        sync: Box<dyn PersistenceSync>,
        store: StateStore,
        prior_sample: usize,
    ) -> Self {
        Self {
            policy,
            providers,
            channels,
            sync,
            store,
            prior_sample,
        }
    }

    /// Wire the real collaborators. A channel that cannot be built is skipped
    /// with a warning; the remaining ones still run.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let policy = TaskPolicy::new(cfg.tasks.clone())?;

        let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
        for s in &cfg.sources {
            providers.push(Box::new(HttpTableProvider::new(s)?));
        }

        Ok(Self::new(
            policy,
            providers,
            build_channels(cfg),
            build_sync(cfg),
            StateStore::new(&cfg.state_path),
            cfg.prior_sample,
        ))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub async fn run_once(&self, today: NaiveDate) -> RunSummary {
        ensure_metrics_described();
        counter!("price_watch_runs_total").increment(1);

        let mut state = self.store.load(today);
        let mut fetched: HashMap<String, Vec<PriceRecord>> = HashMap::new();
        let mut summary = RunSummary {
            period: today,
            tasks: Vec::new(),
        };

        for task in self.policy.tasks() {
            let outcome = match self.policy.verdict(&task.id, &state, today) {
                GateVerdict::Closed => TaskOutcome::Closed,
                GateVerdict::SuppressedBy(by) => TaskOutcome::Suppressed { by },
                GateVerdict::Open => self.run_task(task, &mut state, &mut fetched, today).await,
            };
            tracing::info!(task = %task.id, outcome = ?outcome, "task evaluated");
            summary.tasks.push((task.id.clone(), outcome));
        }
        summary
    }

    async fn run_task(
        &self,
        task: &TaskDescriptor,
        state: &mut PeriodState,
        fetched: &mut HashMap<String, Vec<PriceRecord>>,
        today: NaiveDate,
    ) -> TaskOutcome {
        let names: Vec<String> = if task.sources.is_empty() {
            self.providers.iter().map(|p| p.name().to_string()).collect()
        } else {
            task.sources.clone()
        };

        let mut sections = Vec::with_capacity(names.len());
        let (mut current, mut new) = (0usize, 0usize);
        for name in names {
            let records = match fetched.get(&name) {
                Some(r) => r.clone(),
                None => {
                    let r = self.fetch(&name, today).await;
                    fetched.insert(name.clone(), r.clone());
                    r
                }
            };
            let mut days = partition_with_limit(records, today, self.prior_sample);
            let (marked, n) = mark_novelty(std::mem::take(&mut days.current), state);
            days.current = marked;
            current += days.current.len();
            new += n;
            sections.push(Section {
                source_name: name,
                days,
            });
        }

        let fire = match task.mode {
            TaskMode::Featured => current > 0,
            TaskMode::Polling => new > 0,
        };
        if !fire {
            return TaskOutcome::Quiet { current, new };
        }

        let report = render(&task.id, &sections, today);
        counter!("price_watch_deliveries_total").increment(1);
        let fan = deliver(&report, &self.channels).await;
        let failed_channels: Vec<String> = fan.failed().map(|o| o.channel.clone()).collect();
        if !fan.delivered() {
            tracing::warn!(task = %task.id, failed = ?failed_channels, "no channel delivered; state untouched");
            return TaskOutcome::Undelivered {
                failed: failed_channels,
            };
        }
        counter!("price_watch_new_records_total").increment(new as u64);

        let notified: Vec<PriceRecord> = sections
            .into_iter()
            .flat_map(|s| s.days.current)
            .collect();
        let close = task.mode.closes_on_delivery().then_some(task.id.as_str());
        let (committed, synced) =
            match commit(state, &notified, close, today, &self.store, self.sync.as_ref()).await {
                Ok(c) => (true, c.synced),
                Err(e) => {
                    tracing::error!(task = %task.id, error = %format!("{e:#}"), "state write failed");
                    (false, false)
                }
            };

        TaskOutcome::Delivered {
            current,
            new,
            failed_channels,
            committed,
            synced,
        }
    }

    async fn fetch(&self, name: &str, today: NaiveDate) -> Vec<PriceRecord> {
        match self.providers.iter().find(|p| p.name() == name) {
            Some(p) => fetch_source(p.as_ref(), today).await,
            None => {
                tracing::warn!(source = name, "no provider for source");
                Vec::new()
            }
        }
    }
}

pub fn build_channels(cfg: &AppConfig) -> Vec<Box<dyn Channel>> {
    let mut channels: Vec<Box<dyn Channel>> = Vec::new();
    if let Some(p) = &cfg.channels.pushplus {
        channels.push(Box::new(PushPlusChannel::new(p)));
    }
    if let Some(e) = &cfg.channels.email {
        match EmailChannel::new(e) {
            Ok(ch) => channels.push(Box::new(ch)),
            Err(err) => tracing::warn!(error = %format!("{err:#}"), "email channel disabled"),
        }
    }
    if let Some(w) = &cfg.channels.webhook {
        channels.push(Box::new(WebhookChannel::new(w)));
    }
    channels
}

fn build_sync(cfg: &AppConfig) -> Box<dyn PersistenceSync> {
    match &cfg.sync.git {
        Some(g) if g.enabled => Box::new(GitSync::new(g)),
        _ => Box::new(NoopSync),
    }
}
