// src/watch/core.rs

//! Pure per-watch debounce state machine.
//!
//! [`WatchCore`] consumes [`WatchEvent`]s and answers with the
//! [`WatchCommand`]s the async shell (`watch::runner`) should perform. It
//! owns no timers, channels or tasks, so every transition is unit-testable.
//!
//! ```text
//! Idle --Changed--> PendingDebounce --DebounceElapsed--> Running --RunFinished--> Idle
//!                    ^ Changed restarts the timer         |  ^
//!                                                 Changed |  | RunFinished (re-run starts)
//!                                                         v  |
//!                                                RunningWithPendingRerun
//! any --Cancel--> Cancelled
//! ```

/// State of a single watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    PendingDebounce,
    Running,
    RunningWithPendingRerun,
    Cancelled,
}

/// How a triggered run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    /// The content gate found nothing new; no work was done.
    Skipped,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    /// A matching filesystem change was observed.
    Changed,
    /// The debounce timer ran out without being restarted.
    DebounceElapsed,
    RunFinished(RunOutcome),
    Cancel,
}

/// Effects requested from the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    /// (Re)arm the debounce timer to fire `debounce` from now.
    RestartTimer,
    /// Invoke the trigger. The shell must report back with `RunFinished`.
    StartRun,
    /// Drop any timer and any in-flight run.
    Stop,
}

/// Result of a single [`WatchCore::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchStep {
    pub commands: Vec<WatchCommand>,
    pub keep_running: bool,
}

impl WatchStep {
    fn none() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    fn one(command: WatchCommand) -> Self {
        Self {
            commands: vec![command],
            keep_running: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchCore {
    state: WatchState,
    runs_started: u64,
    runs_failed: u64,
}

impl Default for WatchCore {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchCore {
    pub fn new() -> Self {
        Self {
            state: WatchState::Idle,
            runs_started: 0,
            runs_failed: 0,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Number of `StartRun` commands issued so far.
    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            WatchState::Running | WatchState::RunningWithPendingRerun
        )
    }

    pub fn step(&mut self, event: WatchEvent) -> WatchStep {
        use WatchState::*;

        match (self.state, event) {
            (Cancelled, _) => WatchStep {
                commands: Vec::new(),
                keep_running: false,
            },

            (_, WatchEvent::Cancel) => {
                self.state = Cancelled;
                WatchStep {
                    commands: vec![WatchCommand::Stop],
                    keep_running: false,
                }
            }

            (Idle | PendingDebounce, WatchEvent::Changed) => {
                self.state = PendingDebounce;
                WatchStep::one(WatchCommand::RestartTimer)
            }
            (Running | RunningWithPendingRerun, WatchEvent::Changed) => {
                self.state = RunningWithPendingRerun;
                WatchStep::none()
            }

            (PendingDebounce, WatchEvent::DebounceElapsed) => self.start_run(),

            (Running, WatchEvent::RunFinished(outcome)) => {
                self.record(outcome);
                self.state = Idle;
                WatchStep::none()
            }
            (RunningWithPendingRerun, WatchEvent::RunFinished(outcome)) => {
                self.record(outcome);
                self.start_run()
            }

            // Stale timer or completion; nothing to do.
            (Idle | Running | RunningWithPendingRerun, WatchEvent::DebounceElapsed)
            | (Idle | PendingDebounce, WatchEvent::RunFinished(_)) => WatchStep::none(),
        }
    }

    fn start_run(&mut self) -> WatchStep {
        self.state = WatchState::Running;
        self.runs_started += 1;
        WatchStep::one(WatchCommand::StartRun)
    }

    fn record(&mut self, outcome: RunOutcome) {
        if outcome == RunOutcome::Failed {
            self.runs_failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_of_changes_starts_one_run() {
        let mut core = WatchCore::new();
        for _ in 0..5 {
            let step = core.step(WatchEvent::Changed);
            assert_eq!(step.commands, vec![WatchCommand::RestartTimer]);
        }
        let step = core.step(WatchEvent::DebounceElapsed);
        assert_eq!(step.commands, vec![WatchCommand::StartRun]);
        assert_eq!(core.state(), WatchState::Running);
        assert_eq!(core.runs_started(), 1);
    }

    #[test]
    fn changes_during_run_schedule_exactly_one_rerun() {
        let mut core = WatchCore::new();
        core.step(WatchEvent::Changed);
        core.step(WatchEvent::DebounceElapsed);

        for _ in 0..10 {
            assert!(core.step(WatchEvent::Changed).commands.is_empty());
        }
        assert_eq!(core.state(), WatchState::RunningWithPendingRerun);

        let step = core.step(WatchEvent::RunFinished(RunOutcome::Succeeded));
        assert_eq!(step.commands, vec![WatchCommand::StartRun]);

        let step = core.step(WatchEvent::RunFinished(RunOutcome::Succeeded));
        assert!(step.commands.is_empty());
        assert_eq!(core.state(), WatchState::Idle);
        assert_eq!(core.runs_started(), 2);
    }

    #[test]
    fn failure_returns_to_idle_and_keeps_watching() {
        let mut core = WatchCore::new();
        core.step(WatchEvent::Changed);
        core.step(WatchEvent::DebounceElapsed);
        let step = core.step(WatchEvent::RunFinished(RunOutcome::Failed));
        assert!(step.keep_running);
        assert_eq!(core.state(), WatchState::Idle);
        assert_eq!(core.runs_failed(), 1);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut core = WatchCore::new();
        core.step(WatchEvent::Changed);
        let step = core.step(WatchEvent::Cancel);
        assert_eq!(step.commands, vec![WatchCommand::Stop]);
        assert!(!step.keep_running);

        let step = core.step(WatchEvent::DebounceElapsed);
        assert!(step.commands.is_empty());
        assert!(!step.keep_running);
        assert_eq!(core.state(), WatchState::Cancelled);
    }
}
