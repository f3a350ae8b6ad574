//! Shared types for the matching pipeline.

use std::time::Duration;

/// Status written for a matched volunteer.
pub const ASSIGNED: &str = "Assigned";

/// Failure reason when the oracle found nothing suitable.
pub const NO_SKILL_MATCH: &str = "No Skill Match";

/// Status cell for a volunteer who was not assigned.
pub fn failure_status(classification: Option<&str>) -> String {
    format!("⚠️ {}", classification.unwrap_or(NO_SKILL_MATCH))
}

/// What happened to one pending volunteer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolunteerOutcome {
    Assigned {
        task_id: String,
        /// The assignment filled the task.
        filled: bool,
        notification: String,
    },
    Unmatched {
        status: String,
    },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every volunteer row was scanned.
    Completed,
    /// No task had room when the run started.
    NoOpenTasks,
    /// Every task filled up before the pass finished; remaining
    /// volunteers stay pending for the next run.
    TasksExhausted,
}

/// Summary of one matching run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub open_tasks_at_start: usize,
    pub scanned: usize,
    pub skipped_incomplete: usize,
    pub skipped_processed: usize,
    pub assigned: usize,
    pub unmatched: usize,
    /// Ids of tasks that became full during the run.
    pub filled_tasks: Vec<String>,
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn new(open_tasks_at_start: usize) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            open_tasks_at_start,
            scanned: 0,
            skipped_incomplete: 0,
            skipped_processed: 0,
            assigned: 0,
            unmatched: 0,
            filled_tasks: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}
