// src/watch/runner.rs

//! Async shell around [`WatchCore`].
//!
//! One task per watch: it turns change notifications, timers and run
//! completions into [`WatchEvent`]s, and carries out the resulting
//! [`WatchCommand`]s. The trigger's future is polled inside the same
//! `select!`, so cancelling the watch drops an in-flight run.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::pipeline::TaskFuture;
use crate::watch::core::{RunOutcome, WatchCommand, WatchCore, WatchEvent};
use crate::watch::hash::ContentGate;

/// Work invoked on every debounced trigger.
pub type Trigger = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Sending half used to report matching changes to a watch.
pub type ChangeSender = mpsc::UnboundedSender<()>;

/// Options for a single watch loop.
#[derive(Clone)]
pub struct WatchOptions {
    pub name: String,
    pub debounce: Duration,
    pub gate: Option<ContentGate>,
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("name", &self.name)
            .field("debounce", &self.debounce)
            .field("gate", &self.gate.is_some())
            .finish()
    }
}

/// A live watch. Cancelling, or dropping, stops it: no trigger fires
/// afterwards and an in-flight run is dropped.
pub struct WatchHandle {
    name: String,
    cancel_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("name", &self.name)
            .field("cancelled", &self.cancel_tx.is_none())
            .finish()
    }
}

impl WatchHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the watch. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            debug!(watch = %self.name, "cancelling watch");
            let _ = tx.send(());
        }
        // Stop filesystem notifications as well.
        self.watcher = None;
    }

    /// Cancel and wait for the watch loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }

    pub(crate) fn attach_watcher(&mut self, watcher: RecommendedWatcher) {
        self.watcher = Some(watcher);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start a watch loop fed by the returned [`ChangeSender`].
///
/// The filesystem-backed [`crate::watch::arm`] uses this internally; tests can
/// drive it directly.
pub fn spawn_watch(options: WatchOptions, trigger: Trigger) -> (WatchHandle, ChangeSender) {
    let (change_tx, change_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let name = options.name.clone();

    let join = tokio::spawn(drive(options, trigger, change_rx, cancel_rx));

    let handle = WatchHandle {
        name,
        cancel_tx: Some(cancel_tx),
        join: Some(join),
        watcher: None,
    };
    (handle, change_tx)
}

async fn drive(
    options: WatchOptions,
    trigger: Trigger,
    mut changes: mpsc::UnboundedReceiver<()>,
    mut cancel: oneshot::Receiver<()>,
) {
    let WatchOptions {
        name,
        debounce,
        mut gate,
    } = options;

    let mut core = WatchCore::new();
    let mut deadline: Option<Instant> = None;
    let mut running: Option<TaskFuture> = None;
    let mut queued: VecDeque<WatchEvent> = VecDeque::new();

    info!(watch = %name, debounce_ms = debounce.as_millis() as u64, "watch armed");

    loop {
        let event = match queued.pop_front() {
            Some(event) => event,
            None => {
                tokio::select! {
                    _ = &mut cancel => WatchEvent::Cancel,

                    change = changes.recv() => match change {
                        Some(()) => WatchEvent::Changed,
                        None => WatchEvent::Cancel,
                    },

                    _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        deadline = None;
                        WatchEvent::DebounceElapsed
                    }

                    result = poll_run(&mut running), if running.is_some() => {
                        running = None;
                        WatchEvent::RunFinished(report(&name, result))
                    }
                }
            }
        };

        if let (WatchEvent::RunFinished(RunOutcome::Failed), Some(gate)) = (&event, gate.as_mut()) {
            gate.forget();
        }

        let step = core.step(event);

        for command in step.commands {
            match command {
                WatchCommand::RestartTimer => {
                    deadline = Some(Instant::now() + debounce);
                }
                WatchCommand::StartRun => {
                    if let Some(gate) = gate.as_mut() {
                        if !gate.check_and_record().await {
                            debug!(watch = %name, "content unchanged; skipping run");
                            queued.push_back(WatchEvent::RunFinished(RunOutcome::Skipped));
                            continue;
                        }
                    }
                    info!(watch = %name, run = core.runs_started(), "change detected; running");
                    running = Some(trigger());
                }
                WatchCommand::Stop => {
                    deadline = None;
                    running = None;
                }
            }
        }

        if !step.keep_running {
            break;
        }
    }

    info!(
        watch = %name,
        runs = core.runs_started(),
        failed = core.runs_failed(),
        "watch stopped"
    );
}

async fn poll_run(running: &mut Option<TaskFuture>) -> Result<()> {
    match running.as_mut() {
        Some(run) => run.await,
        None => std::future::pending().await,
    }
}

fn report(name: &str, result: Result<()>) -> RunOutcome {
    match result {
        Ok(()) => {
            debug!(watch = %name, "run finished");
            RunOutcome::Succeeded
        }
        Err(err) => {
            error!(watch = %name, error = %err, "triggered run failed; still watching");
            RunOutcome::Failed
        }
    }
}
