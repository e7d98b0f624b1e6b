// tests/watch_debounce.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use devpipe::errors::DevpipeError;
use devpipe::fs::mock::MockFileSystem;
use devpipe::pipeline::TaskFuture;
use devpipe::watch::{spawn_watch, ContentGate, PathSetMatcher, Trigger, WatchOptions};

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Probe {
    runs: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    finished: AtomicUsize,
}

impl Probe {
    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Trigger that takes `duration` and fails on the runs listed in `fail_on`
/// (1-based).
fn probe_trigger(probe: Arc<Probe>, duration: Duration, fail_on: Vec<usize>) -> Trigger {
    Arc::new(move || -> TaskFuture {
        let probe = Arc::clone(&probe);
        let fail_on = fail_on.clone();
        Box::pin(async move {
            let run = probe.runs.fetch_add(1, Ordering::SeqCst) + 1;
            let now = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
            probe.max_active.fetch_max(now, Ordering::SeqCst);

            sleep(duration).await;

            probe.active.fetch_sub(1, Ordering::SeqCst);
            probe.finished.fetch_add(1, Ordering::SeqCst);
            if fail_on.contains(&run) {
                return Err(DevpipeError::CompileError(format!("run {run} failed")));
            }
            Ok(())
        })
    })
}

fn options(name: &str) -> WatchOptions {
    WatchOptions {
        name: name.to_string(),
        debounce: DEBOUNCE,
        gate: None,
    }
}

#[tokio::test(start_paused = true)]
async fn burst_within_debounce_triggers_once() -> TestResult {
    init_tracing();
    let probe = Arc::new(Probe::default());
    let (_handle, changes) =
        spawn_watch(options("burst"), probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![]));

    for _ in 0..10 {
        changes.send(())?;
        sleep(Duration::from_millis(30)).await;
    }
    assert_eq!(probe.runs(), 0, "still inside the quiet period");

    sleep(Duration::from_millis(500)).await;
    assert_eq!(probe.runs(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn separated_changes_trigger_separately() -> TestResult {
    let probe = Arc::new(Probe::default());
    let (_handle, changes) =
        spawn_watch(options("separate"), probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![]));

    changes.send(())?;
    sleep(Duration::from_millis(300)).await;
    changes.send(())?;
    sleep(Duration::from_millis(300)).await;

    assert_eq!(probe.runs(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn changes_during_run_coalesce_into_one_follow_up() -> TestResult {
    init_tracing();
    let probe = Arc::new(Probe::default());
    let (_handle, changes) = spawn_watch(
        options("mid-run"),
        probe_trigger(Arc::clone(&probe), Duration::from_millis(300), vec![]),
    );

    changes.send(())?;
    // Run starts at ~100ms and lasts until ~400ms.
    sleep(Duration::from_millis(150)).await;
    assert_eq!(probe.runs(), 1);

    for _ in 0..20 {
        changes.send(())?;
        sleep(Duration::from_millis(5)).await;
    }

    sleep(Duration::from_millis(2_000)).await;
    assert_eq!(probe.runs(), 2, "exactly one follow-up run");
    assert_eq!(probe.finished(), 2);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 1, "runs never overlap");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_run_does_not_end_the_watch() -> TestResult {
    let probe = Arc::new(Probe::default());
    let (_handle, changes) = spawn_watch(
        options("failing"),
        probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![1]),
    );

    changes.send(())?;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(probe.runs(), 1);

    changes.send(())?;
    sleep(Duration::from_millis(300)).await;
    assert_eq!(probe.runs(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_before_debounce_prevents_trigger() -> TestResult {
    let probe = Arc::new(Probe::default());
    let (mut handle, changes) =
        spawn_watch(options("cancelled"), probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![]));

    changes.send(())?;
    sleep(Duration::from_millis(50)).await;
    handle.cancel();
    sleep(Duration::from_millis(500)).await;

    // The loop has exited, so further changes go nowhere.
    let _ = changes.send(());
    sleep(Duration::from_millis(500)).await;

    assert_eq!(probe.runs(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_in_flight_run() -> TestResult {
    let probe = Arc::new(Probe::default());
    let (handle, changes) = spawn_watch(
        options("in-flight"),
        probe_trigger(Arc::clone(&probe), Duration::from_secs(1), vec![]),
    );

    changes.send(())?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(probe.runs(), 1);

    handle.shutdown().await;
    sleep(Duration::from_secs(3)).await;

    assert_eq!(probe.finished(), 0, "the in-flight run was dropped");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_cancels() -> TestResult {
    let probe = Arc::new(Probe::default());
    let (handle, changes) =
        spawn_watch(options("dropped"), probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![]));

    changes.send(())?;
    drop(handle);
    sleep(Duration::from_millis(500)).await;

    assert_eq!(probe.runs(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn independent_watches_run_concurrently() -> TestResult {
    let probe = Arc::new(Probe::default());
    let trigger = probe_trigger(Arc::clone(&probe), Duration::from_millis(300), vec![]);
    let (_a, changes_a) = spawn_watch(options("a"), Arc::clone(&trigger));
    let (_b, changes_b) = spawn_watch(options("b"), trigger);

    changes_a.send(())?;
    changes_b.send(())?;
    sleep(Duration::from_millis(1_000)).await;

    assert_eq!(probe.runs(), 2);
    assert_eq!(probe.max_active.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn content_gate_skips_unchanged_inputs() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.html", "v1");
    let matcher = PathSetMatcher::compile("html", &["src/*.html".to_string()])?;

    let probe = Arc::new(Probe::default());
    let mut opts = options("gated");
    opts.debounce = Duration::from_millis(20);
    opts.gate = Some(ContentGate::new(Arc::new(fs.clone()), "/proj", matcher));

    let (_handle, changes) =
        spawn_watch(opts, probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![]));

    changes.send(())?;
    assert!(common::wait_until(Duration::from_secs(2), || probe.runs() == 1).await);

    // Same contents: debounced, hashed, skipped.
    changes.send(())?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(probe.runs(), 1);

    fs.add_file("/proj/src/index.html", "v2");
    changes.send(())?;
    assert!(common::wait_until(Duration::from_secs(2), || probe.runs() == 2).await);

    Ok(())
}

#[tokio::test]
async fn content_gate_retries_after_failed_run() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.ts", "export const a = 1;");
    let matcher = PathSetMatcher::compile("core", &["src/**/*.ts".to_string()])?;

    let probe = Arc::new(Probe::default());
    let mut opts = options("gated-retry");
    opts.debounce = Duration::from_millis(20);
    opts.gate = Some(ContentGate::new(Arc::new(fs.clone()), "/proj", matcher));

    let (_handle, changes) =
        spawn_watch(opts, probe_trigger(Arc::clone(&probe), Duration::ZERO, vec![1]));

    changes.send(())?;
    assert!(common::wait_until(Duration::from_secs(2), || probe.finished() == 1).await);

    // Unchanged inputs, but the previous run failed: run again.
    changes.send(())?;
    assert!(common::wait_until(Duration::from_secs(2), || probe.runs() == 2).await);

    // That run succeeded, so an unchanged save is skipped again.
    assert!(common::wait_until(Duration::from_secs(2), || probe.finished() == 2).await);
    changes.send(())?;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(probe.runs(), 2);

    Ok(())
}
