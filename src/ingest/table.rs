// src/ingest/table.rs
//! HTML price-listing provider: one `<tr>` per quotation.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use crate::config::{ColumnMap, SourceConfig};
use crate::ingest::normalize_text;
use crate::ingest::types::SourceProvider;
use crate::record::PriceRecord;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub struct HttpTableProvider {
    cfg: SourceConfig,
    client: Client,
}

impl HttpTableProvider {
    pub fn new(cfg: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            cfg: cfg.clone(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl SourceProvider for HttpTableProvider {
    async fn fetch_latest(&self, reference_date: NaiveDate) -> Result<Vec<PriceRecord>> {
        let body = self
            .client
            .get(&self.cfg.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.cfg.url))?
            .error_for_status()
            .context("listing non-2xx")?
            .text()
            .await
            .context("listing body")?;
        Ok(parse_listing(&body, &self.cfg, reference_date))
    }

    fn name(&self) -> &str {
        &self.cfg.name
    }
}

/// Parse every table row; rows that do not yield a valid record are skipped.
pub fn parse_listing(html: &str, cfg: &SourceConfig, reference_date: NaiveDate) -> Vec<PriceRecord> {
    let t0 = std::time::Instant::now();
    static RE_ROW: OnceCell<Regex> = OnceCell::new();
    static RE_CELL: OnceCell<Regex> = OnceCell::new();
    let re_row = RE_ROW.get_or_init(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("row regex"));
    let re_cell = RE_CELL
        .get_or_init(|| Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").expect("cell regex"));

    let mut out = Vec::new();
    let mut skipped = 0u64;
    for row in re_row.captures_iter(html) {
        let cells: Vec<String> = re_cell
            .captures_iter(&row[1])
            .map(|c| normalize_text(&c[1]))
            .collect();
        match record_from_cells(&cells, cfg, reference_date) {
            Some(r) => out.push(r),
            None => skipped += 1,
        }
    }

    histogram!("price_watch_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("price_watch_rows_skipped_total").increment(skipped);
    tracing::debug!(source = %cfg.name, kept = out.len(), skipped, "listing parsed");
    out
}

fn record_from_cells(
    cells: &[String],
    cfg: &SourceConfig,
    reference_date: NaiveDate,
) -> Option<PriceRecord> {
    let ColumnMap {
        label,
        specification,
        price,
        vendor,
        date,
    } = cfg.columns;
    let cell = |i: usize| cells.get(i).cloned();

    let raw_label = cell(label)?;
    if let Some(kw) = cfg.keyword.as_deref() {
        if !raw_label.contains(kw) {
            return None;
        }
    }
    let date_text = cell(date)?;
    let observation_date = parse_date(&date_text, reference_date)?;
    let record = PriceRecord {
        source_name: cfg.name.clone(),
        raw_label,
        specification: cell(specification)?,
        price: cell(price)?,
        vendor: cell(vendor)?,
        observation_date,
        observation_date_text: date_text,
        is_new: false,
    };
    record.is_valid().then_some(record)
}

/// Accepts full dates in the usual separators and `MM-DD`, which takes the
/// reference year (or the year before, if that would land in the future).
pub fn parse_date(text: &str, reference_date: NaiveDate) -> Option<NaiveDate> {
    let t = text.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    let (m, d) = t.split_once('-')?;
    let (m, d): (u32, u32) = (m.parse().ok()?, d.parse().ok()?);
    let this_year = NaiveDate::from_ymd_opt(reference_date.year(), m, d);
    match this_year {
        Some(x) if x <= reference_date => Some(x),
        _ => NaiveDate::from_ymd_opt(reference_date.year() - 1, m, d),
    }
}
