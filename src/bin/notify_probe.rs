//! Sends a short greeting through every configured channel and prints each outcome.

use chrono::Utc;
use price_watch::notify::deliver;
use price_watch::report::Report;
use price_watch::watcher::build_channels;
use price_watch::AppConfig;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = match AppConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return;
        }
    };
    let channels = build_channels(&cfg);
    let now = cfg
        .utc_offset()
        .map(|o| Utc::now().with_timezone(&o).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| Utc::now().to_rfc3339());

    let report = Report {
        title: "Good morning from price-watch".into(),
        html: format!("<p>Channel check at {now}.</p><p>If you can read this, the channel works.</p>"),
        text: format!("Channel check at {now}. If you can read this, the channel works."),
    };

    let result = deliver(&report, &channels).await;
    for o in &result.outcomes {
        match &o.reason {
            None => println!("{:<10} ok", o.channel),
            Some(r) => println!("{:<10} FAILED: {r}", o.channel),
        }
    }
    println!(
        "notify-probe done: {}",
        if result.delivered() { "delivered" } else { "not delivered" }
    );
}
