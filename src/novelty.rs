// src/novelty.rs
use crate::fingerprint::fingerprint;
use crate::record::PriceRecord;
use crate::state::PeriodState;

/// Tag each current-period record with `is_new` and count the new ones.
///
/// Does not touch `state`: fingerprints are only recorded after a confirmed
/// delivery, so a failed or skipped send leaves every record new for the next run.
pub fn mark_novelty(
    mut current: Vec<PriceRecord>,
    state: &PeriodState,
) -> (Vec<PriceRecord>, usize) {
    let mut new_count = 0usize;
    for r in current.iter_mut() {
        r.is_new = !state.contains(&fingerprint(r));
        if r.is_new {
            new_count += 1;
        }
    }
    (current, new_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    #[test]
    fn unseen_records_are_new() {
        let state = PeriodState::new(today());
        let (out, n) = mark_novelty(vec![sample("a", today(), "1"), sample("a", today(), "2")], &state);
        assert_eq!(n, 2);
        assert!(out.iter().all(|r| r.is_new));
    }

    #[test]
    fn notified_records_are_not_new() {
        let seen = sample("a", today(), "1");
        let mut state = PeriodState::new(today());
        state.notified_fingerprints.insert(fingerprint(&seen));

        let (out, n) = mark_novelty(vec![seen.clone(), sample("a", today(), "2")], &state);
        assert_eq!(n, 1);
        assert!(!out[0].is_new);
        assert!(out[1].is_new);
    }

    #[test]
    fn stale_flag_is_overwritten() {
        let mut r = sample("a", today(), "1");
        r.is_new = true;
        let mut state = PeriodState::new(today());
        state.notified_fingerprints.insert(fingerprint(&r));
        let (out, n) = mark_novelty(vec![r], &state);
        assert_eq!(n, 0);
        assert!(!out[0].is_new);
    }

    #[test]
    fn empty_input_is_zero_not_error() {
        let state = PeriodState::new(today());
        let (out, n) = mark_novelty(Vec::new(), &state);
        assert!(out.is_empty());
        assert_eq!(n, 0);
    }
}
