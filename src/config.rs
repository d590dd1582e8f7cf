// src/config.rs
//! Run configuration: loaded once from TOML, secrets resolved from env, then
//! passed by reference into every collaborator.

use anyhow::{anyhow, bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::gate::TaskDescriptor;
use crate::partition::PRIOR_SAMPLE;
use crate::state::DEFAULT_STATE_PATH;

pub const ENV_CONFIG_PATH: &str = "PRICE_WATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/price_watch.toml";

pub const ENV_PUSHPLUS_TOKEN: &str = "PUSHPLUS_TOKEN";
pub const ENV_SMTP_PASSWORD: &str = "SMTP_PASSWORD";
pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";

fn default_utc_offset_hours() -> i32 {
    8
}
fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}
fn default_prior_sample() -> usize {
    PRIOR_SAMPLE
}
fn default_fetch_timeout() -> u64 {
    15
}
fn default_send_timeout() -> u64 {
    10
}
fn default_retries() -> u8 {
    3
}
fn default_pushplus_endpoint() -> String {
    "http://www.pushplus.plus/send".to_string()
}
fn default_smtp_port() -> u16 {
    465
}
fn default_git_remote() -> String {
    "origin".to_string()
}
fn default_git_branch() -> String {
    "main".to_string()
}
fn default_git_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Offset of the reference clock; the period is the calendar day there.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_prior_sample")]
    pub prior_sample: usize,
    pub sources: Vec<SourceConfig>,
    pub tasks: Vec<TaskDescriptor>,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Cell indexes of one listing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ColumnMap {
    pub label: usize,
    pub specification: usize,
    pub price: usize,
    pub vendor: usize,
    pub date: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            label: 0,
            specification: 1,
            price: 2,
            vendor: 3,
            date: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub columns: ColumnMap,
    /// Keep only rows whose label contains this text.
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    pub pushplus: Option<PushPlusConfig>,
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushPlusConfig {
    /// `"ENV"` means: read from `PUSHPLUS_TOKEN`.
    pub token: String,
    #[serde(default = "default_pushplus_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    /// `"ENV"` means: read from `SMTP_PASSWORD`.
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// `"ENV"` means: read from `WEBHOOK_URL`.
    pub url: String,
    #[serde(default = "default_send_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    pub git: Option<GitSyncConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitSyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Working tree the state file lives in; defaults to the current directory.
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
    #[serde(default = "default_git_remote")]
    pub remote: String,
    #[serde(default = "default_git_branch")]
    pub branch: String,
    #[serde(default = "default_git_timeout")]
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("loading {}", path.display()))
    }

    /// `$PRICE_WATCH_CONFIG`, then `config/price_watch.toml`.
    pub fn load_default() -> Result<Self> {
        match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(PathBuf::from(p)),
            Err(_) => Self::load_from_file(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing config TOML")?;
        cfg.resolve_secrets()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("utc_offset_hours out of range: {}", self.utc_offset_hours))
    }

    fn resolve_secrets(&mut self) -> Result<()> {
        if let Some(p) = self.channels.pushplus.as_mut() {
            p.token = resolve_env(&p.token, ENV_PUSHPLUS_TOKEN)?;
        }
        if let Some(e) = self.channels.email.as_mut() {
            e.password = resolve_env(&e.password, ENV_SMTP_PASSWORD)?;
        }
        if let Some(w) = self.channels.webhook.as_mut() {
            w.url = resolve_env(&w.url, ENV_WEBHOOK_URL)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.utc_offset()?;
        let mut names = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                bail!("source with empty name");
            }
            if !names.insert(s.name.as_str()) {
                bail!("duplicate source `{}`", s.name);
            }
        }
        if self.tasks.is_empty() {
            bail!("no tasks configured");
        }
        for t in &self.tasks {
            for src in &t.sources {
                if !names.contains(src.as_str()) {
                    bail!("task `{}` references unknown source `{src}`", t.id);
                }
            }
        }
        Ok(())
    }
}

/// `"ENV"` (any case) is replaced by the value of `var`.
fn resolve_env(value: &str, var: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("env") {
        return std::env::var(var).map_err(|_| anyhow!("Missing {var} env var"));
    }
    Ok(value.to_string())
}
