// src/telemetry.rs
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metric registration, so series carry descriptions once a recorder is installed.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("price_watch_runs_total", "Scheduled runs started.");
        describe_counter!("price_watch_records_total", "Records returned by providers.");
        describe_counter!(
            "price_watch_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!(
            "price_watch_rows_skipped_total",
            "Listing rows that did not yield a valid record."
        );
        describe_counter!(
            "price_watch_new_records_total",
            "New records included in a delivered report."
        );
        describe_counter!("price_watch_deliveries_total", "Reports handed to the fan-out.");
        describe_counter!(
            "price_watch_channel_attempts_total",
            "Per-channel send attempts."
        );
        describe_counter!(
            "price_watch_channel_failures_total",
            "Per-channel send failures."
        );
        describe_counter!("price_watch_state_writes_total", "State file replacements.");
        describe_counter!("price_watch_sync_failures_total", "Remote sync failures.");
        describe_histogram!("price_watch_parse_ms", "Listing parse time in milliseconds.");
    });
}
