// src/partition.rs
//! Day partitioning of observed records relative to the reference date.
//!
//! Precondition: providers hand records over newest-first (the listing order of
//! the source page). The prior-day sample keeps the *first* `prior_limit` rows
//! in that order; it bounds report size and does not pick the chronologically
//! latest quotes if a provider ever delivers another order.

use chrono::{Days, NaiveDate};

use crate::record::PriceRecord;

/// Default size of the prior-day sample.
pub const PRIOR_SAMPLE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayPartition {
    /// Records dated `reference_date`, source order.
    pub current: Vec<PriceRecord>,
    /// First records dated `reference_date - 1`, source order.
    pub prior: Vec<PriceRecord>,
}

pub fn partition(records: Vec<PriceRecord>, reference_date: NaiveDate) -> DayPartition {
    partition_with_limit(records, reference_date, PRIOR_SAMPLE)
}

/// Records outside `{reference_date, reference_date - 1}` are dropped.
pub fn partition_with_limit(
    records: Vec<PriceRecord>,
    reference_date: NaiveDate,
    prior_limit: usize,
) -> DayPartition {
    let previous = reference_date.checked_sub_days(Days::new(1));
    let mut out = DayPartition::default();
    for r in records {
        if r.observation_date == reference_date {
            out.current.push(r);
        } else if Some(r.observation_date) == previous && out.prior.len() < prior_limit {
            out.prior.push(r);
        }
    }
    out
}
