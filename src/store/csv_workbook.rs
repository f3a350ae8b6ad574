//! CSV-backed workbook: one `<table name>.csv` file per table.
//!
//! Row 1 of every file is the header and is carried through untouched.
//! Each mutation reads the whole table, edits it in memory and writes it
//! back through a temp file + rename.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::store::traits::{
    AssignmentLogEntry, ResetSummary, Table, TaskRow, TaskStatus, VolunteerRow, Workbook,
    task_cols, volunteer_cols,
};

/// In-memory copy of one table.
#[derive(Debug, Clone, Default)]
struct Sheet {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn set_cell(
        &mut self,
        table: Table,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<(), StorageError> {
        let record = self.rows.get_mut(row).ok_or_else(|| StorageError::RowNotFound {
            table: table.name().to_string(),
            row,
        })?;
        if record.len() <= col {
            record.resize(col + 1, String::new());
        }
        record[col] = value.into();
        Ok(())
    }
}

/// Workbook stored as a directory of CSV files.
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    /// Open a workbook rooted at `dir`. Tables are checked lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a table's CSV file.
    pub fn table_path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.csv", table.name()))
    }

    /// Create any missing table files with their default header.
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        for table in Table::ALL {
            if !self.table_exists(table).await? {
                self.write_sheet(table, &Sheet::default()).await?;
                info!(table = %table, "Created table");
            }
        }
        Ok(())
    }

    /// Raw data rows of a table (header excluded).
    pub async fn read_rows(&self, table: Table) -> Result<Vec<Vec<String>>, StorageError> {
        Ok(self.read_sheet(table).await?.rows)
    }

    async fn read_sheet(&self, table: Table) -> Result<Sheet, StorageError> {
        let path = self.table_path(table);
        if !fs::try_exists(&path).await? {
            return Err(StorageError::MissingTable(table.name().to_string()));
        }
        let bytes = fs::read(&path).await?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|source| StorageError::Csv {
                table: table.name().to_string(),
                source,
            })?;
            records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let mut records = records.into_iter();
        let header = records.next();
        Ok(Sheet {
            header,
            rows: records.collect(),
        })
    }

    async fn write_sheet(&self, table: Table, sheet: &Sheet) -> Result<(), StorageError> {
        let csv_err = |source: csv::Error| StorageError::Csv {
            table: table.name().to_string(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        match &sheet.header {
            Some(header) => writer.write_record(header).map_err(csv_err)?,
            None => writer
                .write_record(table.default_header())
                .map_err(csv_err)?,
        }
        for row in &sheet.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        let path = self.table_path(table);
        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(table = %table, rows = sheet.rows.len(), "Table written");
        Ok(())
    }

    async fn update_cell(
        &self,
        table: Table,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<(), StorageError> {
        let mut sheet = self.read_sheet(table).await?;
        sheet.set_cell(table, row, col, value)?;
        self.write_sheet(table, &sheet).await
    }
}

#[async_trait]
impl Workbook for CsvWorkbook {
    async fn table_exists(&self, table: Table) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.table_path(table)).await?)
    }

    async fn row_count(&self, table: Table) -> Result<usize, StorageError> {
        Ok(self.read_sheet(table).await?.rows.len())
    }

    async fn load_tasks(&self) -> Result<Vec<TaskRow>, StorageError> {
        let sheet = self.read_sheet(Table::Tasks).await?;
        Ok(sheet
            .rows
            .iter()
            .enumerate()
            .map(|(row, record)| task_from_record(row, record))
            .collect())
    }

    async fn set_task_count(&self, row: usize, count: u32) -> Result<(), StorageError> {
        self.update_cell(Table::Tasks, row, task_cols::COUNT, count.to_string())
            .await
    }

    async fn set_task_status(&self, row: usize, status: TaskStatus) -> Result<(), StorageError> {
        self.update_cell(Table::Tasks, row, task_cols::STATUS, status.as_str())
            .await
    }

    async fn load_volunteers(&self) -> Result<Vec<VolunteerRow>, StorageError> {
        let sheet = self.read_sheet(Table::Volunteers).await?;
        Ok(sheet
            .rows
            .iter()
            .enumerate()
            .map(|(row, record)| VolunteerRow {
                row,
                name: cell(record, volunteer_cols::NAME),
                email: cell(record, volunteer_cols::EMAIL),
                phone: cell(record, volunteer_cols::PHONE),
                skills: cell(record, volunteer_cols::SKILLS),
                experience: cell(record, volunteer_cols::EXPERIENCE),
                availability: cell(record, volunteer_cols::AVAILABILITY),
                status: cell(record, volunteer_cols::STATUS),
            })
            .collect())
    }

    async fn set_volunteer_status(&self, row: usize, status: &str) -> Result<(), StorageError> {
        self.update_cell(Table::Volunteers, row, volunteer_cols::STATUS, status)
            .await
    }

    async fn append_assignment(&self, entry: &AssignmentLogEntry) -> Result<(), StorageError> {
        let mut sheet = self.read_sheet(Table::Assignments).await?;
        sheet.rows.push(vec![
            entry.volunteer_name.clone(),
            entry.volunteer_email.clone(),
            entry.task_id.clone(),
            entry.task_name.clone(),
            entry.reasoning.clone(),
            entry.contact_link.clone(),
            entry.notification.clone(),
            entry
                .assigned_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ]);
        self.write_sheet(Table::Assignments, &sheet).await
    }

    async fn reset(&self) -> Result<ResetSummary, StorageError> {
        // Check all three up front so a missing table leaves nothing half-reset.
        for table in Table::ALL {
            if !self.table_exists(table).await? {
                return Err(StorageError::MissingTable(table.name().to_string()));
            }
        }

        let mut summary = ResetSummary::default();

        let mut volunteers = self.read_sheet(Table::Volunteers).await?;
        summary.volunteers_removed = volunteers.rows.len();
        volunteers.rows.clear();
        self.write_sheet(Table::Volunteers, &volunteers).await?;

        let mut log = self.read_sheet(Table::Assignments).await?;
        summary.log_entries_removed = log.rows.len();
        log.rows.clear();
        self.write_sheet(Table::Assignments, &log).await?;

        let mut tasks = self.read_sheet(Table::Tasks).await?;
        summary.tasks_reset = tasks.rows.len();
        for row in 0..tasks.rows.len() {
            tasks.set_cell(Table::Tasks, row, task_cols::COUNT, "0")?;
            tasks.set_cell(Table::Tasks, row, task_cols::STATUS, TaskStatus::Open.as_str())?;
        }
        self.write_sheet(Table::Tasks, &tasks).await?;

        info!(
            volunteers = summary.volunteers_removed,
            log_entries = summary.log_entries_removed,
            tasks = summary.tasks_reset,
            "Workbook reset"
        );
        Ok(summary)
    }
}

/// Trimmed cell value, empty when the row is short.
fn cell(record: &[String], col: usize) -> String {
    record
        .get(col)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn task_from_record(row: usize, record: &[String]) -> TaskRow {
    let id = cell(record, task_cols::ID);

    let raw_capacity = cell(record, task_cols::CAPACITY);
    let capacity = match parse_whole_number(&raw_capacity) {
        Some(n) => n,
        None => {
            if !raw_capacity.is_empty() {
                warn!(task = %id, value = %raw_capacity, "Unreadable capacity, treating as 0");
            }
            0
        }
    };

    let raw_count = cell(record, task_cols::COUNT);
    let count = if raw_count.is_empty() {
        Some(0)
    } else {
        let parsed = parse_whole_number(&raw_count);
        if parsed.is_none() {
            warn!(task = %id, value = %raw_count, "Unreadable current count");
        }
        parsed
    };

    TaskRow {
        row,
        name: cell(record, task_cols::NAME),
        description: cell(record, task_cols::DESCRIPTION),
        skills: cell(record, task_cols::SKILLS),
        time: cell(record, task_cols::TIME),
        capacity,
        count,
        status: cell(record, task_cols::STATUS),
        id,
    }
}

/// Parse a non-negative whole number, accepting spreadsheet floats like `3.0`.
fn parse_whole_number(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        Some(f as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;

    const TASKS: &str = "\
Task ID,Task Name,Description,Skills Required,Location,Time Slot,Max Capacity,Current Count,Status
T-1,Setup,Arrange chairs,Lifting,Hall,Morning,2,,Open
T-2,Registration,Front desk,Communication,Lobby,Afternoon,1,1,Full
T-3,Photos,Event photos,Photography,Hall,Full Day,3.0,2.0,Open
T-4,Broken,Bad cells,None,Hall,Morning,lots,two,Open
";

    const VOLUNTEERS: &str = "\
Timestamp,Name,Email,WhatsApp,Skills,Interests,Experience,Availability,Status
2026-01-01,Asha,asha@mail.org,98765 43210,Photography,Art,2 years,Full Day,
2026-01-01,Ravi,ravi@mail.org,+91 99999 11111,Lifting,,None,Morning,Assigned
2026-01-01,,nobody@mail.org,,,,,,
";

    async fn test_workbook() -> (CsvWorkbook, TempDir) {
        let dir = TempDir::new().unwrap();
        let wb = CsvWorkbook::new(dir.path());
        wb.init().await.unwrap();
        std::fs::write(wb.table_path(Table::Tasks), TASKS).unwrap();
        std::fs::write(wb.table_path(Table::Volunteers), VOLUNTEERS).unwrap();
        (wb, dir)
    }

    #[test]
    fn whole_numbers() {
        assert_eq!(parse_whole_number("4"), Some(4));
        assert_eq!(parse_whole_number(" 4 "), Some(4));
        assert_eq!(parse_whole_number("3.0"), Some(3));
        assert_eq!(parse_whole_number("2.5"), None);
        assert_eq!(parse_whole_number("-1"), None);
        assert_eq!(parse_whole_number("many"), None);
    }

    #[tokio::test]
    async fn init_creates_all_tables_with_headers() {
        let dir = TempDir::new().unwrap();
        let wb = CsvWorkbook::new(dir.path().join("nested"));
        wb.init().await.unwrap();
        for table in Table::ALL {
            assert!(wb.table_exists(table).await.unwrap());
            assert_eq!(wb.row_count(table).await.unwrap(), 0);
        }
        let header = std::fs::read_to_string(wb.table_path(Table::Assignments)).unwrap();
        assert!(header.starts_with("Volunteer Name,Email,Task ID"));
    }

    #[tokio::test]
    async fn missing_table_is_reported() {
        let dir = TempDir::new().unwrap();
        let wb = CsvWorkbook::new(dir.path());
        let err = wb.load_tasks().await.unwrap_err();
        assert!(matches!(err, StorageError::MissingTable(ref t) if t == "Tasks_Master"));
    }

    #[tokio::test]
    async fn load_tasks_parses_positional_columns() {
        let (wb, _dir) = test_workbook().await;
        let tasks = wb.load_tasks().await.unwrap();
        assert_eq!(tasks.len(), 4);

        assert_eq!(tasks[0].id, "T-1");
        assert_eq!(tasks[0].name, "Setup");
        assert_eq!(tasks[0].skills, "Lifting");
        assert_eq!(tasks[0].time, "Morning");
        assert_eq!(tasks[0].capacity, 2);
        assert_eq!(tasks[0].count, Some(0));

        assert_eq!(tasks[2].capacity, 3);
        assert_eq!(tasks[2].count, Some(2));
        assert_eq!(tasks[2].row, 2);

        assert_eq!(tasks[3].capacity, 0);
        assert_eq!(tasks[3].count, None);
    }

    #[tokio::test]
    async fn load_volunteers_reads_short_rows() {
        let (wb, _dir) = test_workbook().await;
        let volunteers = wb.load_volunteers().await.unwrap();
        assert_eq!(volunteers.len(), 3);
        assert_eq!(volunteers[0].name, "Asha");
        assert_eq!(volunteers[0].phone, "98765 43210");
        assert_eq!(volunteers[0].availability, "Full Day");
        assert_eq!(volunteers[0].status, "");
        assert_eq!(volunteers[1].status, "Assigned");
        assert_eq!(volunteers[2].name, "");
    }

    #[tokio::test]
    async fn set_status_pads_short_rows_and_keeps_header() {
        let (wb, _dir) = test_workbook().await;
        wb.set_volunteer_status(2, "⚠️ No Skill Match").await.unwrap();

        let volunteers = wb.load_volunteers().await.unwrap();
        assert_eq!(volunteers[2].status, "⚠️ No Skill Match");

        let raw = std::fs::read_to_string(wb.table_path(Table::Volunteers)).unwrap();
        assert!(raw.starts_with("Timestamp,Name,Email"));
    }

    #[tokio::test]
    async fn set_cell_on_missing_row_fails() {
        let (wb, _dir) = test_workbook().await;
        let err = wb.set_task_count(10, 1).await.unwrap_err();
        assert!(matches!(err, StorageError::RowNotFound { row: 10, .. }));
    }

    #[tokio::test]
    async fn task_count_and_status_updates() {
        let (wb, _dir) = test_workbook().await;
        wb.set_task_count(0, 2).await.unwrap();
        wb.set_task_status(0, TaskStatus::Full).await.unwrap();

        let tasks = wb.load_tasks().await.unwrap();
        assert_eq!(tasks[0].count, Some(2));
        assert_eq!(tasks[0].status, "Full");
        // Untouched cells survive the rewrite
        assert_eq!(tasks[0].description, "Arrange chairs");
    }

    #[tokio::test]
    async fn append_assignment_writes_log_row() {
        let (wb, _dir) = test_workbook().await;
        let entry = AssignmentLogEntry {
            volunteer_name: "Asha".into(),
            volunteer_email: "asha@mail.org".into(),
            task_id: "T-3".into(),
            task_name: "Photos".into(),
            reasoning: "Has a camera, and experience".into(),
            contact_link: "https://wa.me/919876543210?text=Hi".into(),
            notification: "Email Sent ✅".into(),
            assigned_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        };
        wb.append_assignment(&entry).await.unwrap();
        wb.append_assignment(&entry).await.unwrap();

        let rows = wb.read_rows(Table::Assignments).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], "T-3");
        assert_eq!(rows[0][4], "Has a camera, and experience");
        assert_eq!(rows[0][7], "2026-03-01T09:30:00Z");
    }

    #[tokio::test]
    async fn reset_clears_rows_and_reopens_tasks() {
        let (wb, _dir) = test_workbook().await;
        let summary = wb.reset().await.unwrap();
        assert_eq!(
            summary,
            ResetSummary {
                volunteers_removed: 3,
                log_entries_removed: 0,
                tasks_reset: 4,
            }
        );

        assert_eq!(wb.row_count(Table::Volunteers).await.unwrap(), 0);
        let tasks = wb.load_tasks().await.unwrap();
        assert!(tasks.iter().all(|t| t.count == Some(0) && t.status == "Open"));
        assert_eq!(tasks[1].name, "Registration");
    }

    #[tokio::test]
    async fn reset_with_missing_table_changes_nothing() {
        let (wb, _dir) = test_workbook().await;
        std::fs::remove_file(wb.table_path(Table::Assignments)).unwrap();

        assert!(wb.reset().await.is_err());
        assert_eq!(wb.row_count(Table::Volunteers).await.unwrap(), 3);
    }
}
