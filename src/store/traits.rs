//! `Workbook` trait: single async interface over the three named tables.
//!
//! Column positions are positional and fixed so existing spreadsheets
//! exported to CSV keep working cell for cell.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// The three named tables of a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Tasks,
    Volunteers,
    Assignments,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Tasks, Table::Volunteers, Table::Assignments];

    /// Sheet name as the operators know it.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Tasks => "Tasks_Master",
            Table::Volunteers => "Volunteers_Raw",
            Table::Assignments => "Assignments_Log",
        }
    }

    /// Header written when a table file has no header row yet.
    pub fn default_header(&self) -> &'static [&'static str] {
        match self {
            Table::Tasks => &[
                "Task ID",
                "Task Name",
                "Description",
                "Skills Required",
                "Location",
                "Time Slot",
                "Max Capacity",
                "Current Count",
                "Status",
            ],
            Table::Volunteers => &[
                "Timestamp",
                "Name",
                "Email",
                "WhatsApp",
                "Skills",
                "Interests",
                "Experience",
                "Availability",
                "Status",
            ],
            Table::Assignments => &[
                "Volunteer Name",
                "Email",
                "Task ID",
                "Task Name",
                "AI Reasoning",
                "WhatsApp Link",
                "Email Status",
                "Timestamp",
            ],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tasks table columns.
pub mod task_cols {
    pub const ID: usize = 0;
    pub const NAME: usize = 1;
    pub const DESCRIPTION: usize = 2;
    pub const SKILLS: usize = 3;
    pub const TIME: usize = 5;
    pub const CAPACITY: usize = 6;
    pub const COUNT: usize = 7;
    pub const STATUS: usize = 8;
}

/// Volunteers table columns.
pub mod volunteer_cols {
    pub const NAME: usize = 1;
    pub const EMAIL: usize = 2;
    pub const PHONE: usize = 3;
    pub const SKILLS: usize = 4;
    pub const EXPERIENCE: usize = 6;
    pub const AVAILABILITY: usize = 7;
    pub const STATUS: usize = 8;
}

/// Task fill state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Full,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::Full => "Full",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task row. `row` is the 0-based data row (header excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub row: usize,
    pub id: String,
    pub name: String,
    pub description: String,
    pub skills: String,
    pub time: String,
    /// Unreadable capacity cells load as 0.
    pub capacity: u32,
    /// Blank counts load as `Some(0)`, unreadable ones as `None`.
    pub count: Option<u32>,
    pub status: String,
}

/// A volunteer row. `row` is the 0-based data row (header excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerRow {
    pub row: usize,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: String,
    pub experience: String,
    pub availability: String,
    pub status: String,
}

/// One successful assignment. Appended once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentLogEntry {
    pub volunteer_name: String,
    pub volunteer_email: String,
    pub task_id: String,
    pub task_name: String,
    pub reasoning: String,
    pub contact_link: String,
    pub notification: String,
    pub assigned_at: DateTime<Utc>,
}

/// Rows touched by a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub volunteers_removed: usize,
    pub log_entries_removed: usize,
    pub tasks_reset: usize,
}

/// Backend-agnostic workbook trait.
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Whether the named table exists.
    async fn table_exists(&self, table: Table) -> Result<bool, StorageError>;

    /// Number of data rows (header excluded).
    async fn row_count(&self, table: Table) -> Result<usize, StorageError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// Load every task row in sheet order.
    async fn load_tasks(&self) -> Result<Vec<TaskRow>, StorageError>;

    /// Overwrite a task's current count.
    async fn set_task_count(&self, row: usize, count: u32) -> Result<(), StorageError>;

    /// Overwrite a task's status.
    async fn set_task_status(&self, row: usize, status: TaskStatus) -> Result<(), StorageError>;

    // ── Volunteers ──────────────────────────────────────────────────

    /// Load every volunteer row in sheet order.
    async fn load_volunteers(&self) -> Result<Vec<VolunteerRow>, StorageError>;

    /// Overwrite a volunteer's status cell.
    async fn set_volunteer_status(&self, row: usize, status: &str) -> Result<(), StorageError>;

    // ── Assignment log ──────────────────────────────────────────────

    /// Append one entry to the assignment log.
    async fn append_assignment(&self, entry: &AssignmentLogEntry) -> Result<(), StorageError>;

    // ── Admin ───────────────────────────────────────────────────────

    /// Delete all volunteer and log rows, zero every task counter and reopen it.
    async fn reset(&self) -> Result<ResetSummary, StorageError>;
}
