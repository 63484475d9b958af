//! Run lifecycle and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the single process-wide ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Error,
}

impl RunState {
    /// Whether a new run may start from this state.
    pub fn is_terminal_or_idle(&self) -> bool {
        !matches!(self, RunState::Running)
    }
}

/// Snapshot of the ingestion run exposed to status pollers.
///
/// A single instance exists per process; only the orchestrator writes it.
/// The last terminal result stays readable until the next run overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRun {
    #[serde(rename = "status")]
    pub state: RunState,

    /// Coarse progress, 0-100
    pub progress: u8,

    /// Human-readable description of the current phase
    pub message: String,

    /// Aggregate statistics of the last finished run
    pub result: Option<RunResult>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlRun {
    /// The process-start state.
    pub fn idle() -> Self {
        Self {
            state: RunState::Idle,
            progress: 0,
            message: "idle".to_string(),
            result: None,
            started_at: None,
            finished_at: None,
        }
    }
}

impl Default for CrawlRun {
    fn default() -> Self {
        Self::idle()
    }
}

/// Aggregate statistics for one ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunResult {
    pub categories_total: usize,
    pub categories_failed: usize,
    pub products_total: usize,
    pub products_with_image: usize,
    pub products_without_image: usize,
    pub detail_attempted: usize,
    pub detail_failed: usize,
    pub translation_calls: usize,
    pub translation_skipped: usize,

    /// Category-level error strings, in discovery order
    pub errors: Vec<String>,
}

impl RunResult {
    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} categories ({} failed), {} products ({} with image), {} detail fetches ({} failed), {} translated / {} reused",
            self.categories_total,
            self.categories_failed,
            self.products_total,
            self.products_with_image,
            self.detail_attempted,
            self.detail_failed,
            self.translation_calls,
            self.translation_skipped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_lowercase() {
        let run = CrawlRun::idle();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["progress"], 0);
        assert!(json["result"].is_null());
    }

    #[test]
    fn test_terminal_states_allow_restart() {
        assert!(RunState::Idle.is_terminal_or_idle());
        assert!(RunState::Completed.is_terminal_or_idle());
        assert!(RunState::Error.is_terminal_or_idle());
        assert!(!RunState::Running.is_terminal_or_idle());
    }
}
