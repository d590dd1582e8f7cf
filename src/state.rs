// src/state.rs
//! Persisted notification progress for the current period (one calendar day).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::fingerprint::Fingerprint;

pub const DEFAULT_STATE_PATH: &str = "state/price_watch.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodState {
    pub period_key: NaiveDate,
    #[serde(default)]
    pub notified_fingerprints: BTreeSet<Fingerprint>,
    /// task id -> period on which the task last completed
    #[serde(default)]
    pub task_completion: BTreeMap<String, NaiveDate>,
}

impl PeriodState {
    pub fn new(period_key: NaiveDate) -> Self {
        Self {
            period_key,
            notified_fingerprints: BTreeSet::new(),
            task_completion: BTreeMap::new(),
        }
    }

    /// Move to `today` if the stored period differs.
    ///
    /// Fingerprints are cleared; completion history is kept as-is, which leaves
    /// every gate open because no entry can equal the new period yet.
    /// Returns `true` when a rollover happened.
    pub fn roll_to(&mut self, today: NaiveDate) -> bool {
        if self.period_key == today {
            return false;
        }
        self.period_key = today;
        self.notified_fingerprints.clear();
        true
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.notified_fingerprints.contains(fp)
    }
}

/// Single-file store for [`PeriodState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and roll to `today`. Missing or unreadable state is an empty state.
    pub fn load(&self, today: NaiveDate) -> PeriodState {
        let mut state = match self.read() {
            Ok(Some(s)) => s,
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "no state file; starting fresh");
                PeriodState::new(today)
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %format!("{e:#}"), "state unreadable; starting fresh");
                PeriodState::new(today)
            }
        };
        if state.roll_to(today) {
            tracing::info!(period = %today, "new period; notified set cleared");
        }
        state
    }

    fn read(&self) -> Result<Option<PeriodState>> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let state = serde_json::from_str(&s)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(state))
    }

    /// Write the full state via temp file + rename, so readers see either the
    /// old or the new file and never a partial one.
    pub fn save(&self, state: &PeriodState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(state).context("serializing state")?;
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            f.write_all(&json).context("writing state")?;
            f.sync_all().context("syncing state")?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
