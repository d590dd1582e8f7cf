//! Price watch: one scheduled run.
//! Loads config, walks the task list once and exits. Collaborator failures are
//! logged; the process still exits cleanly so the next scheduled run is not affected.

use price_watch::watcher::reference_date;
use price_watch::{AppConfig, Watcher};

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    price_watch::init_tracing();

    let cfg = match AppConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "config unusable; skipping run");
            return;
        }
    };
    let offset = match cfg.utc_offset() {
        Ok(o) => o,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "bad utc offset; skipping run");
            return;
        }
    };
    let watcher = match Watcher::from_config(&cfg) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "could not build watcher; skipping run");
            return;
        }
    };

    let today = reference_date(offset);
    if watcher.channel_count() == 0 {
        tracing::warn!("no notification channel configured");
    }
    let summary = watcher.run_once(today).await;
    tracing::info!(
        period = %summary.period,
        tasks = summary.tasks.len(),
        delivered = summary.delivered(),
        "run finished"
    );
}
