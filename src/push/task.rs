use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw result strings that mark a task run as failed.
pub const FAILURE_RESULTS: [&str; 3] = ["busted", "exception", "testfailed"];

/// A single executed run of a task on a push.
///
/// Retriggers and backfills of the same job produce several records sharing
/// one `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Stable identifier of the job definition (e.g. "test-linux64/opt-mochitest-1")
    pub label: String,
    /// Run time in seconds, always positive
    pub duration: i64,
    /// Raw outcome (e.g. "success", "testfailed", "busted")
    pub result: String,
    /// Why a failure happened (e.g. "not classified", "intermittent")
    pub classification: String,
}

impl TaskRecord {
    pub fn new(
        label: impl Into<String>,
        duration: i64,
        result: impl Into<String>,
        classification: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            duration,
            result: result.into(),
            classification: classification.into(),
        }
    }

    /// Builds a record from a raw query row.
    ///
    /// Returns `None` when a field is missing, has the wrong JSON type, or the
    /// duration is not positive. Incomplete telemetry is expected, so this is
    /// not an error.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let label = raw.get("label")?.as_str()?;
        let duration = raw.get("duration").and_then(parse_duration)?;
        let result = raw.get("result")?.as_str()?;
        let classification = raw.get("classification")?.as_str()?;

        if duration <= 0 {
            return None;
        }

        Some(Self::new(label, duration, result, classification))
    }

    pub fn failed(&self) -> bool {
        FAILURE_RESULTS.contains(&self.result.as_str())
    }
}

// Some backends report durations as floats; whole seconds are kept, and a
// positive sub-second run still counts as one second.
#[allow(clippy::cast_possible_truncation)]
fn parse_duration(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .map(|d| if d > 0.0 { (d as i64).max(1) } else { d as i64 })
    })
}

/// Converts raw query rows into task records, dropping unusable rows.
pub fn ingest(raw: &[Value]) -> Vec<TaskRecord> {
    let tasks: Vec<TaskRecord> = raw.iter().filter_map(TaskRecord::from_raw).collect();

    let dropped = raw.len() - tasks.len();
    if dropped > 0 {
        debug!("Dropped {dropped} incomplete task records out of {}", raw.len());
    }

    tasks
}
