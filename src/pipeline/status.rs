//! Single-flight run-state tracking.
//!
//! One `CrawlRun` exists per process. The orchestrator is its only writer;
//! status pollers read cloned snapshots and never observe a torn update.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::models::{CrawlRun, RunResult, RunState};

/// Shared handle to the process-wide run state.
#[derive(Clone)]
pub struct StatusTracker {
    inner: Arc<Mutex<CrawlRun>>,
}

impl StatusTracker {
    /// Create a tracker in the `Idle` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CrawlRun::idle())),
        }
    }

    /// Read the current run state as an owned snapshot.
    pub fn snapshot(&self) -> CrawlRun {
        self.lock().clone()
    }

    /// Atomically claim the run slot.
    ///
    /// Returns `false` when a run is already in progress; this is the
    /// single-flight gate. On success the state becomes `Running` and the
    /// previous terminal result is cleared.
    pub(crate) fn begin(&self) -> bool {
        let mut run = self.lock();
        if run.state == RunState::Running {
            return false;
        }
        *run = CrawlRun {
            state: RunState::Running,
            progress: 0,
            message: "Starting".to_string(),
            result: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        };
        true
    }

    /// Report progress. Orchestrator only.
    pub(crate) fn update(&self, progress: u8, message: impl Into<String>) {
        let mut run = self.lock();
        run.progress = progress.min(100);
        run.message = message.into();
    }

    /// Finish the run successfully.
    pub(crate) fn finish(&self, result: RunResult) {
        let mut run = self.lock();
        run.state = RunState::Completed;
        run.progress = 100;
        run.message = result.summary();
        run.result = Some(result);
        run.finished_at = Some(Utc::now());
    }

    /// Terminate the run with an unexpected failure.
    pub(crate) fn fail(&self, message: String) {
        let mut run = self.lock();
        run.state = RunState::Error;
        run.message = message;
        run.finished_at = Some(Utc::now());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CrawlRun> {
        self.inner.lock().expect("run status lock poisoned")
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_single_flight() {
        let tracker = StatusTracker::new();
        assert!(tracker.begin());
        assert!(!tracker.begin());
        assert_eq!(tracker.snapshot().state, RunState::Running);
    }

    #[test]
    fn test_terminal_states_release_the_slot() {
        let tracker = StatusTracker::new();

        assert!(tracker.begin());
        tracker.finish(RunResult::default());
        assert_eq!(tracker.snapshot().state, RunState::Completed);
        assert_eq!(tracker.snapshot().progress, 100);

        assert!(tracker.begin());
        tracker.fail("boom".to_string());
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.state, RunState::Error);
        assert_eq!(snapshot.message, "boom");

        assert!(tracker.begin());
    }

    #[test]
    fn test_begin_clears_previous_result() {
        let tracker = StatusTracker::new();
        assert!(tracker.begin());
        tracker.finish(RunResult {
            products_total: 7,
            ..RunResult::default()
        });
        assert!(tracker.snapshot().result.is_some());

        assert!(tracker.begin());
        assert!(tracker.snapshot().result.is_none());
    }

    #[test]
    fn test_update_caps_progress() {
        let tracker = StatusTracker::new();
        assert!(tracker.begin());
        tracker.update(150, "overshoot");
        assert_eq!(tracker.snapshot().progress, 100);
    }
}
