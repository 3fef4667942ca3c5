use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::push::RegressionDistance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regression {
    pub label: String,
    /// Pushes between this one and the last passing run; `null` when unknown
    pub distance: RegressionDistance,
    pub likely: bool,
}

/// Everything known about one push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushReport {
    pub revision: String,
    pub branch: String,
    pub pushid: u64,
    pub backedoutby: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub total_labels: usize,
    pub duration_hours: i64,
    pub scheduled_duration_hours: i64,
    pub failing_labels: Vec<String>,
    pub intermittent_labels: Vec<String>,
    pub candidate_regressions: Vec<String>,
    pub max_depth: usize,
    pub regressions: Vec<Regression>,
}

impl PushReport {
    pub fn likely_count(&self) -> usize {
        self.regressions.iter().filter(|r| r.likely).count()
    }

    pub fn possible_count(&self) -> usize {
        self.regressions.len() - self.likely_count()
    }
}

/// How well the scheduled tasks of a push covered its regressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub revision: String,
    pub branch: String,
    pub tasks_scheduled: usize,
    pub tasks_total: usize,
    /// Labels that ran without being scheduled (retriggers, backfills)
    pub unscheduled_labels: usize,
    /// Scheduled labels as a share of target labels, one decimal
    pub percentage: f64,
    pub scheduled_hours: i64,
    pub backed_out: bool,
    pub possible_regressions: usize,
    pub likely_regressions: usize,
    pub caught: usize,
    pub missed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePush {
    pub revision: String,
    pub pushid: u64,
    pub user: String,
    pub date: Option<DateTime<Utc>>,
    pub task_labels: usize,
    pub possible_regressions: Vec<String>,
    pub likely_regressions: Vec<String>,
}

/// Regressions of every push in a window of a branch, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeReport {
    pub branch: String,
    pub collected_at: DateTime<Utc>,
    pub total_pushes: usize,
    pub pushes: Vec<RangePush>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Push(PushReport),
    Health(HealthReport),
    Range(RangeReport),
}
