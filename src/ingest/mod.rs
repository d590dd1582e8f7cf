// src/ingest/mod.rs
pub mod table;
pub mod types;

use chrono::NaiveDate;
use metrics::counter;
use once_cell::sync::OnceCell;

use crate::ingest::types::SourceProvider;
use crate::record::PriceRecord;

/// Normalize one scraped cell: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (NBSP and full-width spaces included)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 200 chars
    if out.chars().count() > 200 {
        out = out.chars().take(200).collect();
    }
    out
}

/// Fetch one source. Provider errors are logged and read as zero records.
pub async fn fetch_source(provider: &dyn SourceProvider, reference_date: NaiveDate) -> Vec<PriceRecord> {
    match provider.fetch_latest(reference_date).await {
        Ok(v) => {
            counter!("price_watch_records_total").increment(v.len() as u64);
            tracing::info!(source = provider.name(), records = v.len(), "source fetched");
            v
        }
        Err(e) => {
            tracing::warn!(source = provider.name(), error = %format!("{e:#}"), "provider error");
            counter!("price_watch_provider_errors_total").increment(1);
            Vec::new()
        }
    }
}
