// src/record.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observed price quotation, as produced by a source provider.
///
/// `price` is kept as the displayed string; it is not guaranteed to parse as a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub source_name: String,
    pub raw_label: String,
    pub specification: String,
    pub price: String,
    pub vendor: String,
    pub observation_date: NaiveDate,
    pub observation_date_text: String,
    /// Set by novelty marking; never part of the record's identity.
    #[serde(default, skip_serializing)]
    pub is_new: bool,
}

impl PriceRecord {
    /// All identity fields present and non-empty.
    pub fn is_valid(&self) -> bool {
        [
            &self.source_name,
            &self.raw_label,
            &self.specification,
            &self.price,
            &self.vendor,
            &self.observation_date_text,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
pub(crate) fn sample(source: &str, date: NaiveDate, price: &str) -> PriceRecord {
    PriceRecord {
        source_name: source.to_string(),
        raw_label: format!("{source} (bulk)"),
        specification: "industrial grade".to_string(),
        price: price.to_string(),
        vendor: "North Plant Co.".to_string(),
        observation_date: date,
        observation_date_text: date.format("%Y-%m-%d").to_string(),
        is_new: false,
    }
}
