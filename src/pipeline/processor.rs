//! Matching run: one sequential pass over the volunteer table.
//!
//! Flow:
//! 1. Check that all three tables exist (fatal otherwise)
//! 2. Load the open-task catalog (stop early when it is empty)
//! 3. For each pending volunteer: ask the oracle, apply or record the
//!    decision, then wait out the throttle delay
//!
//! Oracle and notification problems never stop the pass; they end up in
//! the volunteer's status cell or the log entry. Storage failures do.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::contact::contact_link;
use crate::error::{self, StorageError};
use crate::notify::{AssignmentEmail, Notifier, notify_volunteer};
use crate::oracle::{Decision, MatchOracle, UNKNOWN_TASK};
use crate::pipeline::catalog::TaskCatalog;
use crate::pipeline::scanner::{ScanVerdict, build_profile, classify};
use crate::pipeline::types::{
    ASSIGNED, RunOutcome, RunReport, VolunteerOutcome, failure_status,
};
use crate::store::{AssignmentLogEntry, Table, TaskStatus, VolunteerRow, Workbook};

/// Drives a matching run over a workbook.
pub struct MatchRunner {
    workbook: Arc<dyn Workbook>,
    oracle: Arc<dyn MatchOracle>,
    notifier: Arc<dyn Notifier>,
    config: RunConfig,
}

impl MatchRunner {
    pub fn new(
        workbook: Arc<dyn Workbook>,
        oracle: Arc<dyn MatchOracle>,
        notifier: Arc<dyn Notifier>,
        config: RunConfig,
    ) -> Self {
        Self {
            workbook,
            oracle,
            notifier,
            config,
        }
    }

    /// Run one full matching pass.
    pub async fn run(&self) -> error::Result<RunReport> {
        let started = Instant::now();

        for table in Table::ALL {
            if !self.workbook.table_exists(table).await? {
                return Err(StorageError::MissingTable(table.name().to_string()).into());
            }
        }

        let mut catalog = TaskCatalog::from_rows(self.workbook.load_tasks().await?);
        let mut report = RunReport::new(catalog.len());

        if catalog.is_empty() {
            warn!("No tasks available (all full or table empty)");
            report.outcome = RunOutcome::NoOpenTasks;
            report.elapsed = started.elapsed();
            return Ok(report);
        }
        info!(
            open_tasks = catalog.len(),
            oracle = self.oracle.name(),
            notifier = self.notifier.name(),
            "Starting matching run"
        );

        let volunteers = self.workbook.load_volunteers().await?;
        for volunteer in &volunteers {
            match classify(volunteer) {
                ScanVerdict::Incomplete => {
                    report.skipped_incomplete += 1;
                    continue;
                }
                ScanVerdict::AlreadyProcessed => {
                    report.skipped_processed += 1;
                    continue;
                }
                ScanVerdict::Pending => {}
            }

            if catalog.is_empty() {
                info!("Every task is full, leaving remaining volunteers for the next run");
                report.outcome = RunOutcome::TasksExhausted;
                break;
            }

            report.scanned += 1;
            match self.process_volunteer(&mut catalog, volunteer).await? {
                VolunteerOutcome::Assigned {
                    task_id, filled, ..
                } => {
                    report.assigned += 1;
                    if filled {
                        report.filled_tasks.push(task_id);
                    }
                }
                VolunteerOutcome::Unmatched { .. } => report.unmatched += 1,
            }

            tokio::time::sleep(self.config.delay).await;
        }

        report.elapsed = started.elapsed();
        info!(
            assigned = report.assigned,
            unmatched = report.unmatched,
            skipped = report.skipped_incomplete + report.skipped_processed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Matching run finished"
        );
        Ok(report)
    }

    /// Ask the oracle about one pending volunteer and apply its decision.
    pub async fn process_volunteer(
        &self,
        catalog: &mut TaskCatalog,
        volunteer: &VolunteerRow,
    ) -> Result<VolunteerOutcome, StorageError> {
        info!(volunteer = %volunteer.name, row = volunteer.row, "Checking volunteer");

        let profile = build_profile(volunteer);
        let decision = self.oracle.decide(&profile, &catalog.descriptions()).await;
        debug!(volunteer = %volunteer.name, ?decision, "Oracle replied");

        match decision {
            Decision::Assign {
                task_id,
                task_name,
                reasoning,
            } => {
                if !catalog.contains(&task_id) {
                    warn!(
                        volunteer = %volunteer.name,
                        task = %task_id,
                        "Oracle picked a task that is not open"
                    );
                    return self.record_failure(volunteer, Some(UNKNOWN_TASK)).await;
                }
                self.apply_assignment(catalog, volunteer, &task_id, &task_name, &reasoning)
                    .await
            }
            Decision::NoMatch { classification } => {
                self.record_failure(volunteer, classification.as_deref()).await
            }
        }
    }

    async fn apply_assignment(
        &self,
        catalog: &mut TaskCatalog,
        volunteer: &VolunteerRow,
        task_id: &str,
        task_name: &str,
        reasoning: &str,
    ) -> Result<VolunteerOutcome, StorageError> {
        let link = contact_link(
            &volunteer.phone,
            &self.config.country_code,
            &volunteer.name,
            task_name,
        );

        let email = AssignmentEmail {
            to: volunteer.email.clone(),
            volunteer_name: volunteer.name.clone(),
            task_name: task_name.to_string(),
            reasoning: reasoning.to_string(),
        };
        let notification =
            notify_volunteer(self.notifier.as_ref(), &email, &self.config.placeholder_domain)
                .await;

        self.workbook
            .append_assignment(&AssignmentLogEntry {
                volunteer_name: volunteer.name.clone(),
                volunteer_email: volunteer.email.clone(),
                task_id: task_id.to_string(),
                task_name: task_name.to_string(),
                reasoning: reasoning.to_string(),
                contact_link: link,
                notification: notification.label().to_string(),
                assigned_at: Utc::now(),
            })
            .await?;

        self.workbook
            .set_volunteer_status(volunteer.row, ASSIGNED)
            .await?;

        let mut filled = false;
        if let Some(reservation) = catalog.reserve(task_id) {
            self.workbook
                .set_task_count(reservation.row, reservation.new_count)
                .await?;
            if reservation.fills_task() {
                self.workbook
                    .set_task_status(reservation.row, TaskStatus::Full)
                    .await?;
                filled = true;
                info!(task = %task_id, capacity = reservation.capacity, "Task is now full");
            }
            catalog.commit(&reservation);
        }

        info!(
            volunteer = %volunteer.name,
            task = %task_id,
            remaining = catalog.remaining(task_id).unwrap_or(0),
            email = notification.label(),
            "Volunteer assigned"
        );
        Ok(VolunteerOutcome::Assigned {
            task_id: task_id.to_string(),
            filled,
            notification: notification.label().to_string(),
        })
    }

    async fn record_failure(
        &self,
        volunteer: &VolunteerRow,
        classification: Option<&str>,
    ) -> Result<VolunteerOutcome, StorageError> {
        let status = failure_status(classification);
        warn!(volunteer = %volunteer.name, status = %status, "Volunteer not assigned");
        self.workbook
            .set_volunteer_status(volunteer.row, &status)
            .await?;
        Ok(VolunteerOutcome::Unmatched { status })
    }
}
