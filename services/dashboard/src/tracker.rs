//! Tracking for active and recently finished script runs.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::runner::RunOutcome;

const MAX_COMPLETED: usize = 100;
const RECENT_IN_STATUS: usize = 20;

/// A run still in progress.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub id: String,
    pub script: String,
    pub started_at: DateTime<Utc>,
}

/// A finished run.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    pub id: String,
    pub script: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    /// `succeeded`, `failed`, `timed_out` or `error`
    pub status: String,
    pub exit_code: Option<i32>,
    pub error_message: Option<String>,
}

/// Response for `GET /api/runs`.
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    pub active: Vec<ActiveRun>,
    pub recent: Vec<CompletedRun>,
    pub total_completed: usize,
}

pub struct RunTracker {
    active: Mutex<HashMap<String, ActiveRun>>,
    completed: Mutex<VecDeque<CompletedRun>>,
    max_completed: usize,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::with_capacity(MAX_COMPLETED)
    }

    pub fn with_capacity(max_completed: usize) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            completed: Mutex::new(VecDeque::new()),
            max_completed,
        }
    }

    pub async fn start(&self, id: &str, script: &str) {
        let run = ActiveRun {
            id: id.to_string(),
            script: script.to_string(),
            started_at: Utc::now(),
        };
        self.active.lock().await.insert(id.to_string(), run);
    }

    /// Record a run that produced an outcome (including failed and timed out scripts).
    pub async fn complete(&self, id: &str, outcome: &RunOutcome) {
        self.finish(
            id,
            outcome.success(),
            outcome.status.as_str(),
            outcome.exit_code,
            None,
        )
        .await;
    }

    /// Record a run that could not be executed at all.
    pub async fn fail(&self, id: &str, error: &str) {
        self.finish(id, false, "error", None, Some(error.to_string()))
            .await;
    }

    async fn finish(
        &self,
        id: &str,
        success: bool,
        status: &str,
        exit_code: Option<i32>,
        error_message: Option<String>,
    ) {
        let Some(run) = self.active.lock().await.remove(id) else {
            return;
        };

        let completed_at = Utc::now();
        let duration_ms = (completed_at - run.started_at).num_milliseconds().max(0) as u64;
        let completed = CompletedRun {
            id: run.id,
            script: run.script,
            started_at: run.started_at,
            completed_at,
            duration_ms,
            success,
            status: status.to_string(),
            exit_code,
            error_message,
        };

        let mut completed_list = self.completed.lock().await;
        completed_list.push_front(completed);
        completed_list.truncate(self.max_completed);
    }

    pub async fn status(&self) -> RunStatusResponse {
        let active = self.active.lock().await;
        let completed = self.completed.lock().await;

        RunStatusResponse {
            active: active.values().cloned().collect(),
            recent: completed.iter().take(RECENT_IN_STATUS).cloned().collect(),
            total_completed: completed.len(),
        }
    }
}
