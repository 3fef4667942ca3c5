use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::task::TaskRecord;

/// Classifications that leave a failure unexplained.
pub const UNEXPLAINED_CLASSIFICATIONS: [&str; 2] = ["not classified", "fixed by commit"];

/// Overall verdict for a label across all of its runs on a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Intermittent,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Intermittent => "INTERMITTENT",
        })
    }
}

/// Summarizes the state of one task label across retriggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSummary {
    label: String,
    tasks: Vec<TaskRecord>,
    status: Status,
}

impl LabelSummary {
    /// Builds a summary for `label`.
    ///
    /// # Panics
    ///
    /// Panics if `tasks` is empty or any task carries a different label.
    /// Callers group records by label before building summaries.
    pub fn new(label: impl Into<String>, tasks: Vec<TaskRecord>) -> Self {
        let label = label.into();
        assert!(
            tasks.iter().all(|t| t.label == label),
            "LabelSummary for '{label}' built from tasks of another label"
        );
        assert!(!tasks.is_empty(), "LabelSummary for '{label}' has no tasks");

        let status = compute_status(&tasks);

        Self {
            label,
            tasks,
            status,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    #[cfg(test)]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Classifications of the failed runs only.
    pub fn classifications(&self) -> BTreeSet<&str> {
        self.tasks
            .iter()
            .filter(|t| t.failed())
            .map(|t| t.classification.as_str())
            .collect()
    }

    pub fn results(&self) -> BTreeSet<&str> {
        self.tasks.iter().map(|t| t.result.as_str()).collect()
    }

    /// Whether this label is a regression suspect before looking at ancestors.
    pub fn is_candidate_regression(&self) -> bool {
        self.status != Status::Pass
            && self
                .classifications()
                .iter()
                .any(|c| UNEXPLAINED_CLASSIFICATIONS.contains(c))
    }
}

fn compute_status(tasks: &[TaskRecord]) -> Status {
    let any_failed = tasks.iter().any(TaskRecord::failed);
    let all_failed = tasks.iter().all(TaskRecord::failed);

    match (any_failed, all_failed) {
        (false, _) => Status::Pass,
        (true, true) => Status::Fail,
        (true, false) => Status::Intermittent,
    }
}
