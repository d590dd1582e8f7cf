// src/gate.rs
//! Per-task, per-period completion gates and the cross-task suppression policy.
//!
//! A task is OPEN until it completes on the current period, then CLOSED until the
//! reference date moves on. A closed task cannot be reopened within its period.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

use crate::state::PeriodState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Once-per-day digest. Fires when the period has any records; closes on delivery.
    Featured,
    /// Continuous polling. Fires only on new records; never closes.
    Polling,
}

impl TaskMode {
    pub fn closes_on_delivery(self) -> bool {
        matches!(self, TaskMode::Featured)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub mode: TaskMode,
    /// Source names feeding this task; empty means every configured source.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Lower-priority tasks silenced for the day once this one is closed.
    #[serde(default)]
    pub suppresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Open,
    Closed,
    SuppressedBy(String),
}

pub fn is_open(task_id: &str, state: &PeriodState, reference_date: NaiveDate) -> bool {
    state.task_completion.get(task_id) != Some(&reference_date)
}

pub fn close(task_id: &str, state: &mut PeriodState, reference_date: NaiveDate) {
    state
        .task_completion
        .insert(task_id.to_string(), reference_date);
}

/// Ordered task list (highest priority first) plus its suppression relation.
#[derive(Debug, Clone)]
pub struct TaskPolicy {
    tasks: Vec<TaskDescriptor>,
}

impl TaskPolicy {
    /// Rejects duplicate ids, unknown or self references, and suppression of a
    /// task that comes earlier in the list.
    pub fn new(tasks: Vec<TaskDescriptor>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for t in &tasks {
            if t.id.trim().is_empty() {
                bail!("task with empty id");
            }
            if !seen.insert(t.id.as_str()) {
                bail!("duplicate task id `{}`", t.id);
            }
        }
        for (i, t) in tasks.iter().enumerate() {
            for target in &t.suppresses {
                match tasks.iter().position(|o| &o.id == target) {
                    None => bail!("task `{}` suppresses unknown task `{target}`", t.id),
                    Some(j) if j <= i => bail!(
                        "task `{}` may only suppress lower-priority tasks, not `{target}`",
                        t.id
                    ),
                    Some(_) => {}
                }
            }
        }
        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn verdict(&self, task_id: &str, state: &PeriodState, today: NaiveDate) -> GateVerdict {
        if !is_open(task_id, state, today) {
            return GateVerdict::Closed;
        }
        let suppressor = self
            .tasks
            .iter()
            .find(|t| t.suppresses.iter().any(|s| s == task_id) && !is_open(&t.id, state, today));
        match suppressor {
            Some(t) => GateVerdict::SuppressedBy(t.id.clone()),
            None => GateVerdict::Open,
        }
    }
}
