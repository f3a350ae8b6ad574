//! Persistence layer: positional tables kept in a CSV workbook directory.

pub mod csv_workbook;
pub mod traits;

pub use csv_workbook::CsvWorkbook;
pub use traits::{
    AssignmentLogEntry, ResetSummary, Table, TaskRow, TaskStatus, VolunteerRow, Workbook,
};
