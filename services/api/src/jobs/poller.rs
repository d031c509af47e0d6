//! services/api/src/jobs/poller.rs
//!
//! Drives repeated status checks for one dispatched run until it reaches a
//! terminal state. Modelled as an explicit state machine with a cancellable
//! timer so the watcher's lifetime is tied to its caller, not to an
//! untracked interval.

use audiopintar_core::domain::RunStatus;
use audiopintar_core::ports::{JobRunner, PortResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The observable lifecycle of one polled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Dispatch succeeded, no status observed yet.
    Dispatched,
    /// At least one status lookup has been made, run not yet terminal.
    Polling,
    /// The run completed and the refresh hook has fired.
    Completed,
    /// The run terminated failed; no refresh fires.
    Failed,
    /// The caller cancelled before the run turned terminal. The backend job
    /// keeps running regardless - there is no cancellation path into it.
    Abandoned,
}

/// Polls a `JobRunner` for one run at a fixed interval.
///
/// The current state is published through a watch channel so callers can
/// observe the run's progress without waiting for `run` to return.
pub struct JobPoller {
    runner: Arc<dyn JobRunner>,
    interval: Duration,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
}

impl JobPoller {
    pub fn new(runner: Arc<dyn JobRunner>, interval: Duration, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(PollState::Dispatched);
        Self {
            runner,
            interval,
            cancel,
            state,
        }
    }

    /// Subscribes to the poller's state transitions.
    pub fn watch_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Polls until the run turns terminal or the caller goes away.
    ///
    /// `on_complete` fires exactly once, and only after `COMPLETED` is
    /// observed. A lookup error stops polling and surfaces the error rather
    /// than retrying indefinitely against a permanently broken run.
    pub async fn run<F, Fut>(&self, run_id: &str, on_complete: F) -> PortResult<PollState>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(run_id, "poller cancelled by caller");
                    self.state.send_replace(PollState::Abandoned);
                    return Ok(PollState::Abandoned);
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let run = self.runner.status(run_id).await?;

            match run.status {
                RunStatus::Completed => {
                    on_complete().await;
                    info!(run_id, "run completed");
                    self.state.send_replace(PollState::Completed);
                    return Ok(PollState::Completed);
                }
                RunStatus::Failed => {
                    warn!(run_id, "run failed");
                    self.state.send_replace(PollState::Failed);
                    return Ok(PollState::Failed);
                }
                // Not terminal yet; keep the timer going.
                RunStatus::Pending | RunStatus::Executing => {
                    self.state.send_replace(PollState::Polling);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;
    use audiopintar_core::ports::PortError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn poller(runner: Arc<ScriptedRunner>, cancel: CancellationToken) -> JobPoller {
        JobPoller::new(runner, Duration::from_millis(5), cancel)
    }

    #[tokio::test]
    async fn refresh_fires_exactly_once_after_completion() {
        let runner = Arc::new(ScriptedRunner::with_statuses(
            "r1",
            vec![RunStatus::Pending, RunStatus::Executing, RunStatus::Completed],
        ));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let counter = refreshes.clone();
        let outcome = poller(runner.clone(), CancellationToken::new())
            .run("r1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollState::Completed);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // Polling stopped at the terminal status: exactly the three scripted
        // lookups happened, none after COMPLETED was observed.
        assert_eq!(runner.lookup_count(), 3);
    }

    #[tokio::test]
    async fn state_transitions_are_observable() {
        let runner = Arc::new(ScriptedRunner::with_statuses(
            "r1",
            vec![RunStatus::Pending, RunStatus::Executing, RunStatus::Completed],
        ));
        let poller = poller(runner, CancellationToken::new());

        let mut states = poller.watch_state();
        assert_eq!(*states.borrow(), PollState::Dispatched);

        let handle = tokio::spawn(async move { poller.run("r1", || async {}).await });

        // The first non-terminal lookup moves the watch to Polling.
        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), PollState::Polling);

        handle.await.unwrap().unwrap();
        assert_eq!(*states.borrow(), PollState::Completed);
    }

    #[tokio::test]
    async fn failed_run_terminates_without_refresh() {
        let runner = Arc::new(ScriptedRunner::with_statuses(
            "r1",
            vec![RunStatus::Pending, RunStatus::Failed],
        ));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let counter = refreshes.clone();
        let outcome = poller(runner, CancellationToken::new())
            .run("r1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollState::Failed);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lookup_error_stops_polling_and_surfaces() {
        let runner = Arc::new(ScriptedRunner::erroring("r1"));

        let outcome = poller(runner.clone(), CancellationToken::new())
            .run("r1", || async {})
            .await;

        assert!(matches!(outcome, Err(PortError::Unexpected(_))));
        assert_eq!(runner.lookup_count(), 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_the_watch() {
        let runner = Arc::new(ScriptedRunner::with_statuses(
            "r1",
            vec![RunStatus::Pending; 1000],
        ));
        let cancel = CancellationToken::new();

        let poller = poller(runner, cancel.clone());
        let states = poller.watch_state();
        let handle = tokio::spawn(async move { poller.run("r1", || async {}).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, PollState::Abandoned);
        assert_eq!(*states.borrow(), PollState::Abandoned);
    }
}
