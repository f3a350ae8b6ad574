//! Operator maintenance: table checks and resets.

use crate::error::Result;
use crate::store::{ResetSummary, Table, Workbook};

/// Presence of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCheck {
    pub table: Table,
    /// Data rows, `None` when the table is missing.
    pub rows: Option<usize>,
}

impl TableCheck {
    pub fn present(&self) -> bool {
        self.rows.is_some()
    }
}

/// Look for every table the matcher needs.
pub async fn check_tables(workbook: &dyn Workbook) -> Result<Vec<TableCheck>> {
    let mut checks = Vec::with_capacity(Table::ALL.len());
    for table in Table::ALL {
        let rows = if workbook.table_exists(table).await? {
            Some(workbook.row_count(table).await?)
        } else {
            None
        };
        checks.push(TableCheck { table, rows });
    }
    Ok(checks)
}

/// Whether an operator's answer confirms a destructive action.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Wipe volunteers and the log, reopen every task.
pub async fn reset_workbook(workbook: &dyn Workbook) -> Result<ResetSummary> {
    Ok(workbook.reset().await?)
}
