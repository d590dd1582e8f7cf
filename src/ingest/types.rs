// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;

use crate::record::PriceRecord;

/// Fetch/parse collaborator for one configured source.
///
/// Records come back newest-first, each with a valid `observation_date`.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self, reference_date: NaiveDate) -> Result<Vec<PriceRecord>>;
    fn name(&self) -> &str;
}

/// Fixture provider: hands back a fixed record list.
pub struct StaticProvider {
    name: String,
    records: Vec<PriceRecord>,
    fail: bool,
}

impl StaticProvider {
    pub fn new(name: &str, records: Vec<PriceRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
            fail: false,
        }
    }

    /// A provider whose every fetch errors.
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait::async_trait]
impl SourceProvider for StaticProvider {
    async fn fetch_latest(&self, _reference_date: NaiveDate) -> Result<Vec<PriceRecord>> {
        if self.fail {
            anyhow::bail!("{} fetch failed", self.name);
        }
        Ok(self.records.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
