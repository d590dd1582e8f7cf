// tests/run_scenarios.rs
use chrono::NaiveDate;
use price_watch::gate::{TaskDescriptor, TaskMode, TaskPolicy};
use price_watch::ingest::types::{SourceProvider, StaticProvider};
use price_watch::notify::{Channel, MockChannel};
use price_watch::novelty::mark_novelty;
use price_watch::partition::partition;
use price_watch::state::StateStore;
use price_watch::sync::MockSync;
use price_watch::{fingerprint, PeriodState, PriceRecord, TaskOutcome, Watcher};
use std::path::Path;
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn yesterday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
}

fn rec(source: &str, date: NaiveDate, price: &str) -> PriceRecord {
    PriceRecord {
        source_name: source.into(),
        raw_label: "Butadiene".into(),
        specification: "99.5%".into(),
        price: price.into(),
        vendor: "North Plant".into(),
        observation_date: date,
        observation_date_text: date.format("%Y-%m-%d").to_string(),
        is_new: false,
    }
}

fn task(id: &str, mode: TaskMode, sources: &[&str], suppresses: &[&str]) -> TaskDescriptor {
    TaskDescriptor {
        id: id.into(),
        mode,
        sources: sources.iter().map(|s| s.to_string()).collect(),
        suppresses: suppresses.iter().map(|s| s.to_string()).collect(),
    }
}

fn polling_only() -> Vec<TaskDescriptor> {
    vec![task("polling", TaskMode::Polling, &[], &[])]
}

struct Rig {
    watcher: Watcher,
    sync: Arc<MockSync>,
}

fn rig(
    state_path: &Path,
    tasks: Vec<TaskDescriptor>,
    providers: Vec<StaticProvider>,
    channels: &[Arc<MockChannel>],
) -> Rig {
    let sync = Arc::new(MockSync::new());
    let providers: Vec<Box<dyn SourceProvider>> = providers
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn SourceProvider>)
        .collect();
    let channels: Vec<Box<dyn Channel>> = channels
        .iter()
        .map(|c| Box::new(c.clone()) as Box<dyn Channel>)
        .collect();
    let watcher = Watcher::new(
        TaskPolicy::new(tasks).unwrap(),
        providers,
        channels,
        Box::new(sync.clone()),
        StateStore::new(state_path),
        3,
    );
    Rig { watcher, sync }
}

#[test]
fn today_and_yesterday_split_with_single_new() {
    let mut input = vec![rec("a", today(), "100")];
    for p in ["B1", "B2", "B3", "B4"] {
        input.push(rec("a", yesterday(), p));
    }
    let days = partition(input, today());
    let (current, new_count) = mark_novelty(days.current, &PeriodState::new(today()));

    assert_eq!(current.len(), 1);
    assert_eq!(current[0].price, "100");
    let prior: Vec<_> = days.prior.iter().map(|r| r.price.as_str()).collect();
    assert_eq!(prior, vec!["B1", "B2", "B3"]);
    assert_eq!(new_count, 1);
}

#[tokio::test]
async fn second_run_same_period_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let push = Arc::new(MockChannel::new("push", true));
    let records = vec![rec("a", today(), "100"), rec("a", yesterday(), "99")];

    let r1 = rig(&path, polling_only(), vec![StaticProvider::new("a", records.clone())], &[push.clone()]);
    let s1 = r1.watcher.run_once(today()).await;
    assert!(matches!(
        s1.outcome("polling"),
        Some(TaskOutcome::Delivered { new: 1, committed: true, synced: true, .. })
    ));
    assert_eq!(r1.sync.call_count(), 1);

    let r2 = rig(&path, polling_only(), vec![StaticProvider::new("a", records)], &[push.clone()]);
    let s2 = r2.watcher.run_once(today()).await;
    assert_eq!(
        s2.outcome("polling"),
        Some(&TaskOutcome::Quiet { current: 1, new: 0 })
    );
    assert_eq!(push.call_count(), 1);
    assert_eq!(r2.sync.call_count(), 0);
}

#[tokio::test]
async fn one_working_channel_is_enough_to_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let down = Arc::new(MockChannel::new("push", false));
    let up = Arc::new(MockChannel::new("email", true));
    let r = rec("a", today(), "100");

    let rg = rig(&path, polling_only(), vec![StaticProvider::new("a", vec![r.clone()])], &[down.clone(), up.clone()]);
    let s = rg.watcher.run_once(today()).await;

    match s.outcome("polling") {
        Some(TaskOutcome::Delivered { failed_channels, committed, .. }) => {
            assert_eq!(failed_channels, &vec!["push".to_string()]);
            assert!(*committed);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(down.call_count(), 1);
    assert_eq!(up.call_count(), 1);
    assert!(StateStore::new(&path).load(today()).contains(&fingerprint(&r)));
}

#[tokio::test]
async fn failed_delivery_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let down = Arc::new(MockChannel::new("push", false));
    let records = vec![rec("a", today(), "100")];

    let r1 = rig(&path, polling_only(), vec![StaticProvider::new("a", records.clone())], &[down.clone()]);
    let s1 = r1.watcher.run_once(today()).await;
    assert_eq!(
        s1.outcome("polling"),
        Some(&TaskOutcome::Undelivered { failed: vec!["push".into()] })
    );
    assert!(!path.exists());
    assert_eq!(r1.sync.call_count(), 0);

    // next run still sees the record as new
    let up = Arc::new(MockChannel::new("push", true));
    let r2 = rig(&path, polling_only(), vec![StaticProvider::new("a", records)], &[up.clone()]);
    let s2 = r2.watcher.run_once(today()).await;
    assert!(matches!(s2.outcome("polling"), Some(TaskOutcome::Delivered { new: 1, .. })));
}

#[tokio::test]
async fn closed_featured_task_stays_closed_same_day() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let push = Arc::new(MockChannel::new("push", true));
    let tasks = || vec![task("featured-A", TaskMode::Featured, &["a"], &[])];

    let r1 = rig(&path, tasks(), vec![StaticProvider::new("a", vec![rec("a", today(), "100")])], &[push.clone()]);
    let s1 = r1.watcher.run_once(today()).await;
    assert!(matches!(s1.outcome("featured-A"), Some(TaskOutcome::Delivered { .. })));

    // fresh data arrives later the same day
    let more = vec![rec("a", today(), "101"), rec("a", today(), "100")];
    let r2 = rig(&path, tasks(), vec![StaticProvider::new("a", more.clone())], &[push.clone()]);
    let s2 = r2.watcher.run_once(today()).await;
    assert_eq!(s2.outcome("featured-A"), Some(&TaskOutcome::Closed));
    assert_eq!(push.call_count(), 1);

    // the next day the gate is open again
    let tomorrow = today().succ_opt().unwrap();
    let r3 = rig(
        &path,
        tasks(),
        vec![StaticProvider::new("a", vec![rec("a", tomorrow, "102")])],
        &[push.clone()],
    );
    let s3 = r3.watcher.run_once(tomorrow).await;
    assert!(matches!(s3.outcome("featured-A"), Some(TaskOutcome::Delivered { new: 1, .. })));
}

#[tokio::test]
async fn featured_completion_suppresses_polling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let push = Arc::new(MockChannel::new("push", true));
    let tasks = vec![
        task("featured-A", TaskMode::Featured, &["a"], &["polling"]),
        task("polling", TaskMode::Polling, &[], &[]),
    ];
    let providers = vec![
        StaticProvider::new("a", vec![rec("a", today(), "100")]),
        StaticProvider::new("b", vec![rec("b", today(), "55")]),
    ];

    let rg = rig(&path, tasks, providers, &[push.clone()]);
    let s = rg.watcher.run_once(today()).await;
    assert!(matches!(s.outcome("featured-A"), Some(TaskOutcome::Delivered { .. })));
    assert_eq!(
        s.outcome("polling"),
        Some(&TaskOutcome::Suppressed { by: "featured-A".into() })
    );
    assert_eq!(push.call_count(), 1);
}

#[tokio::test]
async fn polling_runs_when_featured_has_nothing_yet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let push = Arc::new(MockChannel::new("push", true));
    let tasks = vec![
        task("featured-A", TaskMode::Featured, &["a"], &["polling"]),
        task("polling", TaskMode::Polling, &[], &[]),
    ];
    let providers = vec![
        StaticProvider::new("a", vec![rec("a", yesterday(), "99")]),
        StaticProvider::new("b", vec![rec("b", today(), "55")]),
    ];

    let s = rig(&path, tasks, providers, &[push.clone()]).watcher.run_once(today()).await;
    assert_eq!(
        s.outcome("featured-A"),
        Some(&TaskOutcome::Quiet { current: 0, new: 0 })
    );
    assert!(matches!(s.outcome("polling"), Some(TaskOutcome::Delivered { new: 1, .. })));
}

#[tokio::test]
async fn new_period_resets_seen_set_and_gates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = StateStore::new(&path);
    let mut old = PeriodState::new(yesterday());
    old.notified_fingerprints.insert(fingerprint(&rec("a", yesterday(), "99")));
    old.task_completion.insert("featured-A".into(), yesterday());
    store.save(&old).unwrap();

    let loaded = store.load(today());
    assert_eq!(loaded.period_key, today());
    assert!(loaded.notified_fingerprints.is_empty());
    assert!(price_watch::gate::is_open("featured-A", &loaded, today()));
}

#[tokio::test]
async fn provider_failure_is_a_quiet_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let push = Arc::new(MockChannel::new("push", true));
    let s = rig(&path, polling_only(), vec![StaticProvider::failing("a")], &[push.clone()])
        .watcher
        .run_once(today())
        .await;
    assert_eq!(
        s.outcome("polling"),
        Some(&TaskOutcome::Quiet { current: 0, new: 0 })
    );
    assert_eq!(push.call_count(), 0);
}

#[tokio::test]
async fn corrupt_state_file_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"\x00\x01garbage").unwrap();
    let push = Arc::new(MockChannel::new("push", true));
    let s = rig(&path, polling_only(), vec![StaticProvider::new("a", vec![rec("a", today(), "1")])], &[push])
        .watcher
        .run_once(today())
        .await;
    assert!(matches!(s.outcome("polling"), Some(TaskOutcome::Delivered { committed: true, .. })));
    assert_eq!(StateStore::new(&path).load(today()).notified_fingerprints.len(), 1);
}

#[tokio::test]
async fn unwritable_state_still_blocks_resend_within_run() {
    let dir = tempfile::tempdir().unwrap();
    // a directory where the state file should be: the final rename fails
    let path = dir.path().join("state.json");
    std::fs::create_dir(&path).unwrap();
    let push = Arc::new(MockChannel::new("push", true));
    let tasks = vec![
        task("featured-A", TaskMode::Featured, &["a"], &[]),
        task("polling", TaskMode::Polling, &[], &[]),
    ];

    let rg = rig(&path, tasks, vec![StaticProvider::new("a", vec![rec("a", today(), "100")])], &[push.clone()]);
    let s = rg.watcher.run_once(today()).await;

    assert!(matches!(
        s.outcome("featured-A"),
        Some(TaskOutcome::Delivered { new: 1, committed: false, synced: false, .. })
    ));
    assert_eq!(
        s.outcome("polling"),
        Some(&TaskOutcome::Quiet { current: 1, new: 0 })
    );
    assert_eq!(push.call_count(), 1);
    assert_eq!(rg.sync.call_count(), 0);
}
