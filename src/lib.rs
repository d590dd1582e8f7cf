// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod commit;
pub mod config;
pub mod fingerprint;
pub mod gate;
pub mod ingest;
pub mod notify;
pub mod novelty;
pub mod partition;
pub mod record;
pub mod report;
pub mod state;
pub mod sync;
pub mod telemetry;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::fingerprint::{fingerprint, Fingerprint};
pub use crate::record::PriceRecord;
pub use crate::state::PeriodState;
pub use crate::watcher::{RunSummary, TaskOutcome, Watcher};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("price_watch=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
