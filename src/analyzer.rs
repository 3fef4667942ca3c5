use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{info, warn};

use crate::error::Result;
use crate::output::{PhaseProgress, RangeProgress};
use crate::providers::mozilla::PushEntry;
use crate::push::{CiSource, Push, Status};
use crate::report::{HealthReport, PushReport, RangePush, RangeReport, Regression};

/// Builds pushes for one branch and turns their analysis into reports.
pub struct PushAnalyzer<S> {
    source: Arc<S>,
    branch: String,
    max_depth: usize,
    concurrency: usize,
}

impl<S: CiSource> PushAnalyzer<S> {
    pub fn new(source: Arc<S>, branch: impl Into<String>, max_depth: usize, concurrency: usize) -> Self {
        Self {
            source,
            branch: branch.into(),
            max_depth,
            concurrency: concurrency.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn push(&self, revision: &str) -> Push<S> {
        Push::new(revision, self.branch.clone(), Arc::clone(&self.source))
            .with_max_depth(self.max_depth)
    }

    /// Analyzes one push: task aggregates, candidates and regressions.
    pub async fn push_report(&self, revision: &str) -> Result<PushReport> {
        info!("Analyzing push {}:{revision}", self.branch);
        let push = self.push(revision);

        let progress = PhaseProgress::start_phase_1(revision);
        let tasks = progress.check(push.tasks().await)?;
        if tasks.is_empty() {
            warn!("No tasks found for {revision}");
        }

        let progress = progress.finish_phase_1_start_phase_2(tasks.len());
        let regressions = progress.check(push.regressions().await)?;

        let progress = progress.finish_phase_2_start_phase_3(regressions.len());
        let summaries = progress.check(push.label_summaries().await)?;
        let pushid = progress.check(push.pushid().await)?;
        let backedoutby = progress.check(push.backedoutby().await)?;
        let duration_hours = progress.check(push.duration().await)?;
        let scheduled_duration_hours = progress.check(push.scheduled_duration().await)?;
        let candidates = progress.check(push.candidate_regressions().await)?;
        let labels_with = |status: Status| -> Vec<String> {
            summaries
                .values()
                .filter(|s| s.status() == status)
                .map(|s| s.label().to_string())
                .collect()
        };

        let report = PushReport {
            revision: push.revision().to_string(),
            branch: push.branch().to_string(),
            pushid,
            backedoutby: backedoutby.map(ToString::to_string),
            collected_at: Utc::now(),
            total_tasks: tasks.len(),
            total_labels: summaries.len(),
            duration_hours,
            scheduled_duration_hours,
            failing_labels: labels_with(Status::Fail),
            intermittent_labels: labels_with(Status::Intermittent),
            candidate_regressions: to_strings(candidates),
            max_depth: push.max_depth(),
            regressions: regressions
                .iter()
                .map(|(label, distance)| Regression {
                    label: label.clone(),
                    distance: *distance,
                    likely: distance.is_likely(),
                })
                .collect(),
        };

        progress.finish_phase_3();
        Ok(report)
    }

    /// Compares what was scheduled on a push with what could have run, and
    /// how many regressions the scheduled tasks caught.
    pub async fn health_report(&self, revision: &str) -> Result<HealthReport> {
        info!("Checking health of push {}:{revision}", self.branch);
        let push = self.push(revision);

        let tasks_scheduled = push.scheduled_task_labels().await?.len();
        let tasks_total = push.target_task_labels().await?.len();

        Ok(HealthReport {
            revision: revision.to_string(),
            branch: self.branch.clone(),
            tasks_scheduled,
            tasks_total,
            unscheduled_labels: push.unscheduled_task_labels().await?.len(),
            percentage: scheduled_percentage(tasks_scheduled, tasks_total),
            scheduled_hours: push.scheduled_duration().await?,
            backed_out: push.backedout().await?,
            possible_regressions: push.possible_regressions().await?.len(),
            likely_regressions: push.likely_regressions().await?.len(),
            caught: push.regressions_caught().await?.len(),
            missed: push.regressions_missed().await?.len(),
        })
    }

    /// Analyzes consecutive pushes, oldest first.
    ///
    /// Each push's parent is the previous entry, so no revision metadata is
    /// needed inside the range and ancestor caches are shared.
    pub async fn range_report(&self, entries: &[PushEntry]) -> Result<RangeReport> {
        info!("Analyzing {} pushes on {}", entries.len(), self.branch);

        let mut pushes: Vec<Arc<Push<S>>> = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut push = self.push(&entry.revision);
            if let Some(previous) = pushes.last() {
                push = push.with_parent(Arc::clone(previous));
            }
            pushes.push(Arc::new(push));
        }

        stream::iter(pushes.iter().map(|push| push.tasks()))
            .buffer_unordered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        let progress = RangeProgress::start(entries.len());
        let mut rows = Vec::with_capacity(entries.len());

        for (entry, push) in entries.iter().zip(&pushes) {
            progress.advance(&entry.revision);
            rows.push(progress.check(range_row(entry, push).await)?);
        }
        progress.finish();

        Ok(RangeReport {
            branch: self.branch.clone(),
            collected_at: Utc::now(),
            total_pushes: rows.len(),
            pushes: rows,
        })
    }
}

async fn range_row<S: CiSource>(entry: &PushEntry, push: &Push<S>) -> Result<RangePush> {
    Ok(RangePush {
        revision: entry.revision.clone(),
        pushid: entry.pushid,
        user: entry.user.clone(),
        date: entry.date,
        task_labels: push.task_labels().await?.len(),
        possible_regressions: to_strings(push.possible_regressions().await?),
        likely_regressions: to_strings(push.likely_regressions().await?),
    })
}

fn to_strings<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    labels.into_iter().map(ToString::to_string).collect()
}

#[allow(clippy::cast_precision_loss)]
fn scheduled_percentage(scheduled: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percentage = scheduled as f64 / total as f64 * 100.0;
    (percentage * 10.0).round() / 10.0
}
