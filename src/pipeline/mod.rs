//! Matching pipeline.
//!
//! One run flows through:
//! 1. `TaskCatalog::from_rows()`: open tasks and their remaining capacity
//! 2. `scanner::classify()`: which volunteer rows still need a match
//! 3. `MatchOracle::decide()`: one decision per pending volunteer
//! 4. `MatchRunner`: applies the decision to the workbook

pub mod catalog;
pub mod processor;
pub mod scanner;
pub mod types;

pub use catalog::{OpenTask, TaskCatalog};
pub use processor::MatchRunner;
pub use types::{RunOutcome, RunReport, VolunteerOutcome};
