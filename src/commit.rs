// src/commit.rs
//! Post-delivery state commit: record what was sent, persist, then back up.

use anyhow::Result;
use chrono::NaiveDate;
use metrics::counter;

use crate::fingerprint::fingerprint;
use crate::gate;
use crate::record::PriceRecord;
use crate::state::{PeriodState, StateStore};
use crate::sync::PersistenceSync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub fingerprints_added: usize,
    pub synced: bool,
}

/// Only call after a delivery judged successful.
///
/// The in-memory state is updated even when the write fails: the report went
/// out, and later tasks of the same run must see that. A failed write returns
/// `Err`; a failed remote sync is only logged since the local file stays
/// authoritative.
pub async fn commit(
    state: &mut PeriodState,
    notified: &[PriceRecord],
    close_task: Option<&str>,
    today: NaiveDate,
    store: &StateStore,
    sync: &dyn PersistenceSync,
) -> Result<CommitOutcome> {
    let mut added = 0usize;
    for r in notified.iter().filter(|r| r.is_new) {
        if state.notified_fingerprints.insert(fingerprint(r)) {
            added += 1;
        }
    }
    if let Some(task) = close_task {
        gate::close(task, state, today);
    }

    store.save(state)?;
    counter!("price_watch_state_writes_total").increment(1);
    tracing::info!(path = %store.path().display(), added, closed = ?close_task, "state committed");

    let synced = match sync.store(store.path()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "remote sync failed; local state kept");
            counter!("price_watch_sync_failures_total").increment(1);
            false
        }
    };

    Ok(CommitOutcome {
        fingerprints_added: added,
        synced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;
    use crate::sync::MockSync;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    #[tokio::test]
    async fn adds_only_new_records_and_closes_gate() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let sync = MockSync::new();
        let mut state = PeriodState::new(today());

        let mut fresh = sample("a", today(), "1");
        fresh.is_new = true;
        let old = sample("a", today(), "2");

        let out = commit(&mut state, &[fresh.clone(), old.clone()], Some("featured-a"), today(), &store, &sync)
            .await
            .unwrap();
        assert_eq!(out.fingerprints_added, 1);
        assert!(out.synced);
        assert!(state.contains(&fingerprint(&fresh)));
        assert!(!state.contains(&fingerprint(&old)));
        assert!(!gate::is_open("featured-a", &state, today()));
        assert_eq!(store.load(today()), state);
        assert_eq!(sync.call_count(), 1);
    }

    #[tokio::test]
    async fn sync_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = PeriodState::new(today());
        let mut r = sample("a", today(), "1");
        r.is_new = true;

        let out = commit(&mut state, &[r], None, today(), &store, &MockSync::failing())
            .await
            .unwrap();
        assert!(!out.synced);
        assert_eq!(store.load(today()).notified_fingerprints.len(), 1);
    }
}
