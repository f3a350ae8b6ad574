//! Matching oracle: asks an external decision service which open task
//! fits a volunteer best.
//!
//! The oracle never fails a run. Every error is folded into a
//! [`Decision::NoMatch`] carrying a classification that ends up in the
//! volunteer's status cell.

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiOracle;

use async_trait::async_trait;
use serde::Deserialize;

/// Task id the model returns when nothing fits.
pub const NO_MATCH: &str = "NO_MATCH";

/// No credential configured; no request was made.
pub const MISSING_KEY: &str = "MISSING_KEY";

/// Transport failure or a reply we could not parse.
pub const SCRIPT_CRASH: &str = "SCRIPT_CRASH";

/// The model named a task that is not open.
pub const UNKNOWN_TASK: &str = "UNKNOWN_TASK";

/// Outcome of one oracle consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Assign the volunteer to this task.
    Assign {
        task_id: String,
        task_name: String,
        reasoning: String,
    },
    /// Do not assign. `classification` is `None` for a plain "nothing fits"
    /// and `Some` when the service or our handling of it failed.
    NoMatch { classification: Option<String> },
}

impl Decision {
    pub fn no_match() -> Self {
        Decision::NoMatch {
            classification: None,
        }
    }

    pub fn failed(classification: impl Into<String>) -> Self {
        Decision::NoMatch {
            classification: Some(classification.into()),
        }
    }
}

/// Pluggable decision provider.
#[async_trait]
pub trait MatchOracle: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Pick the best task for `profile` among `tasks` (one description per entry).
    async fn decide(&self, profile: &str, tasks: &[String]) -> Decision;
}

/// Decision JSON as the model writes it.
#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(rename = "taskId", default)]
    task_id: Option<TaskId>,
    #[serde(rename = "taskName", default)]
    task_name: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Sheets often hold numeric ids, which the model echoes back as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskId {
    Text(String),
    Number(serde_json::Number),
}

impl TaskId {
    fn into_string(self) -> String {
        match self {
            TaskId::Text(text) => text.trim().to_string(),
            TaskId::Number(n) => match n.as_f64() {
                // `101.0` refers to the same row as `101`
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                    format!("{}", f as i64)
                }
                _ => n.to_string(),
            },
        }
    }
}

/// Parse the model's answer text into a decision.
///
/// Code fences are stripped first. A missing, blank or `NO_MATCH` task id is
/// a plain no-match.
pub fn parse_decision(text: &str) -> Result<Decision, serde_json::Error> {
    let cleaned = strip_code_fences(text);
    let raw: RawDecision = serde_json::from_str(&cleaned)?;

    let task_id = raw.task_id.map(TaskId::into_string).unwrap_or_default();
    if task_id.is_empty() || task_id == NO_MATCH {
        return Ok(Decision::no_match());
    }

    Ok(Decision::Assign {
        task_id,
        task_name: raw.task_name.unwrap_or_default(),
        reasoning: raw.reasoning.unwrap_or_default(),
    })
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
