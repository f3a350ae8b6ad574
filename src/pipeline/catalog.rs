//! Task catalog: the open tasks of one run and their remaining capacity.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::store::TaskRow;

/// A task that can still take volunteers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTask {
    pub id: String,
    pub name: String,
    /// One-line description handed to the oracle.
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    row: usize,
    capacity: u32,
    count: u32,
}

/// Counter change for one assignment, computed before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub task_id: String,
    pub row: usize,
    pub new_count: u32,
    pub capacity: u32,
}

impl Reservation {
    pub fn fills_task(&self) -> bool {
        self.new_count >= self.capacity
    }
}

/// Ordered open tasks plus an index of task id → remaining capacity.
///
/// The list and the index always hold the same ids.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    open: Vec<OpenTask>,
    index: HashMap<String, Slot>,
}

impl TaskCatalog {
    /// Keep tasks whose count is below capacity, in sheet order.
    pub fn from_rows(rows: Vec<TaskRow>) -> Self {
        let mut catalog = Self::default();
        for task in rows {
            if task.id.is_empty() {
                debug!(row = task.row, "Skipping task without an id");
                continue;
            }
            let Some(count) = task.count else {
                continue;
            };
            if count >= task.capacity {
                continue;
            }
            if catalog.index.contains_key(&task.id) {
                warn!(task = %task.id, row = task.row, "Duplicate task id, keeping the first row");
                continue;
            }

            catalog.index.insert(
                task.id.clone(),
                Slot {
                    row: task.row,
                    capacity: task.capacity,
                    count,
                },
            );
            catalog.open.push(OpenTask {
                details: describe(&task),
                id: task.id,
                name: task.name,
            });
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    #[cfg(test)]
    pub fn open_tasks(&self) -> &[OpenTask] {
        &self.open
    }

    /// Remaining places for a task, `None` when it is not open.
    pub fn remaining(&self, task_id: &str) -> Option<u32> {
        self.index
            .get(task_id)
            .map(|slot| slot.capacity.saturating_sub(slot.count))
    }

    /// Descriptions of every open task, in order.
    pub fn descriptions(&self) -> Vec<String> {
        self.open.iter().map(|t| t.details.clone()).collect()
    }

    /// Work out the counter change for assigning one more volunteer.
    pub fn reserve(&self, task_id: &str) -> Option<Reservation> {
        self.index.get(task_id).map(|slot| Reservation {
            task_id: task_id.to_string(),
            row: slot.row,
            new_count: slot.count + 1,
            capacity: slot.capacity,
        })
    }

    /// Apply a persisted reservation. Full tasks leave the catalog.
    pub fn commit(&mut self, reservation: &Reservation) {
        if reservation.fills_task() {
            self.index.remove(&reservation.task_id);
            self.open.retain(|t| t.id != reservation.task_id);
        } else if let Some(slot) = self.index.get_mut(&reservation.task_id) {
            slot.count = reservation.new_count;
        }
    }
}

fn describe(task: &TaskRow) -> String {
    format!(
        "ID: {} | Task: {} | Needs: {} | Time: {}",
        task.id, task.name, task.skills, task.time
    )
}
