use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{PushLensError, Result};

use super::regression::RegressionDistance;
use super::source::{CiSource, PushMetadata};
use super::summary::LabelSummary;
use super::task::{self, TaskRecord};

/// Number of ancestor pushes inspected before a regression is reported as unknown.
pub const DEFAULT_MAX_DEPTH: usize = 5;

const TARGET_TASKS_ARTIFACT: &str = "target-tasks.json";
const TASK_GRAPH_ARTIFACT: &str = "task-graph.json";

/// A single push, identified by the revision of its top-most commit.
///
/// Construction is cheap. Everything else is fetched on first access through
/// the `CiSource` and cached for the lifetime of the value; CI results of a
/// past push are treated as immutable.
pub struct Push<S> {
    revision: String,
    branch: String,
    max_depth: usize,
    source: Arc<S>,
    metadata: OnceCell<PushMetadata>,
    parent: OnceCell<Option<Arc<Push<S>>>>,
    tasks: OnceCell<Vec<TaskRecord>>,
    label_summaries: OnceCell<IndexMap<String, LabelSummary>>,
    decision_artifact_urls: OnceCell<Vec<String>>,
    target_task_labels: OnceCell<BTreeSet<String>>,
    scheduled_task_labels: OnceCell<BTreeSet<String>>,
    pub(super) regressions: OnceCell<BTreeMap<String, RegressionDistance>>,
}

impl<S> std::fmt::Debug for Push<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Push")
            .field("revision", &self.revision)
            .field("branch", &self.branch)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl<S: CiSource> Push<S> {
    pub fn new(revision: impl Into<String>, branch: impl Into<String>, source: Arc<S>) -> Self {
        Self {
            revision: revision.into(),
            branch: branch.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            source,
            metadata: OnceCell::new(),
            parent: OnceCell::new(),
            tasks: OnceCell::new(),
            label_summaries: OnceCell::new(),
            decision_artifact_urls: OnceCell::new(),
            target_task_labels: OnceCell::new(),
            scheduled_task_labels: OnceCell::new(),
            regressions: OnceCell::new(),
        }
    }

    /// Sets how many ancestors the regression search may inspect.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Uses an already known parent push instead of resolving it from
    /// revision metadata.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<Push<S>>) -> Self {
        self.parent = OnceCell::new_with(Some(Some(parent)));
        self
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// A push on the same branch sharing this push's source and settings.
    fn related(&self, revision: &str) -> Self {
        Self::new(revision, self.branch.clone(), Arc::clone(&self.source))
            .with_max_depth(self.max_depth)
    }

    async fn metadata(&self) -> Result<&PushMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                debug!("Fetching metadata for {}:{}", self.branch, self.revision);
                self.source.push_metadata(&self.branch, &self.revision).await
            })
            .await
    }

    pub async fn pushid(&self) -> Result<u64> {
        Ok(self.metadata().await?.pushid)
    }

    /// Revision of the commit that backed this push out, if any.
    pub async fn backedoutby(&self) -> Result<Option<&str>> {
        Ok(self.metadata().await?.backedoutby.as_deref())
    }

    pub async fn backedout(&self) -> Result<bool> {
        Ok(self.backedoutby().await?.is_some())
    }

    /// The nearest ancestor belonging to a different push.
    ///
    /// Parent revisions that are part of this same push are walked past.
    /// Returns `None` at the root of the history.
    pub async fn parent(&self) -> Result<Option<&Arc<Push<S>>>> {
        let parent = self
            .parent
            .get_or_try_init(|| async { self.resolve_parent().await.map(|p| p.map(Arc::new)) })
            .await?;
        Ok(parent.as_ref())
    }

    async fn resolve_parent(&self) -> Result<Option<Push<S>>> {
        let pushid = self.pushid().await?;
        let mut frontier = self.metadata().await?.parents.clone();
        let mut visited = HashSet::from([self.revision.clone()]);

        loop {
            let mut same_push = None;

            for revision in frontier {
                if !visited.insert(revision.clone()) {
                    return Err(PushLensError::AncestryCycle {
                        revision: self.revision.clone(),
                        repeated: revision,
                    });
                }

                let candidate = self.related(&revision);
                if candidate.pushid().await? != pushid {
                    debug!("Parent of {} is {}", self.revision, revision);
                    return Ok(Some(candidate));
                }

                same_push.get_or_insert(candidate);
            }

            match same_push {
                Some(commit) => frontier = commit.metadata().await?.parents.clone(),
                None => {
                    debug!("{} has no parent push", self.revision);
                    return Ok(None);
                }
            }
        }
    }

    /// All task runs on the push, retriggers and backfills included.
    pub async fn tasks(&self) -> Result<&[TaskRecord]> {
        let tasks = self
            .tasks
            .get_or_try_init(|| async {
                debug!("Fetching tasks for {}", self.revision);
                let raw = self
                    .source
                    .task_records(&self.branch, &self.revision)
                    .await?;
                Ok::<_, PushLensError>(task::ingest(&raw))
            })
            .await?;
        Ok(tasks)
    }

    /// Label summaries in first-seen order, one per distinct label.
    pub async fn label_summaries(&self) -> Result<&IndexMap<String, LabelSummary>> {
        self.label_summaries
            .get_or_try_init(|| async {
                let mut grouped: IndexMap<&str, Vec<TaskRecord>> = IndexMap::new();
                for task in self.tasks().await? {
                    grouped
                        .entry(task.label.as_str())
                        .or_default()
                        .push(task.clone());
                }

                Ok::<_, PushLensError>(
                    grouped
                        .into_iter()
                        .map(|(label, tasks)| (label.to_string(), LabelSummary::new(label, tasks)))
                        .collect(),
                )
            })
            .await
    }

    /// Labels that ran on the push.
    pub async fn task_labels(&self) -> Result<BTreeSet<&str>> {
        Ok(self
            .label_summaries()
            .await?
            .keys()
            .map(String::as_str)
            .collect())
    }

    /// Every label that could possibly have run on the push.
    pub async fn target_task_labels(&self) -> Result<&BTreeSet<String>> {
        self.target_task_labels
            .get_or_try_init(|| async {
                let artifact = self.decision_artifact(TARGET_TASKS_ARTIFACT).await?;
                parse_target_tasks(&artifact)
            })
            .await
    }

    /// Labels originally scheduled on the push, excluding retriggers and backfills.
    pub async fn scheduled_task_labels(&self) -> Result<&BTreeSet<String>> {
        self.scheduled_task_labels
            .get_or_try_init(|| async {
                let artifact = self.decision_artifact(TASK_GRAPH_ARTIFACT).await?;
                parse_task_graph(&artifact)
            })
            .await
    }

    /// Labels that ran without being originally scheduled (backfills, added jobs).
    pub async fn unscheduled_task_labels(&self) -> Result<BTreeSet<&str>> {
        let scheduled = self.scheduled_task_labels().await?;
        Ok(self
            .task_labels()
            .await?
            .into_iter()
            .filter(|label| !scheduled.contains(*label))
            .collect())
    }

    /// Total runtime of every task on the push, in whole hours.
    pub async fn duration(&self) -> Result<i64> {
        let seconds: i64 = self.tasks().await?.iter().map(|t| t.duration).sum();
        Ok(seconds / 3600)
    }

    /// Runtime counting only the first run of each label, in whole hours.
    pub async fn scheduled_duration(&self) -> Result<i64> {
        let mut seen = HashSet::new();
        let seconds: i64 = self
            .tasks()
            .await?
            .iter()
            .filter(|t| seen.insert(t.label.as_str()))
            .map(|t| t.duration)
            .sum();
        Ok(seconds / 3600)
    }

    async fn decision_artifact(&self, name: &str) -> Result<Value> {
        let urls = self
            .decision_artifact_urls
            .get_or_try_init(|| async {
                debug!("Fetching decision artifact list for {}", self.revision);
                self.source
                    .decision_artifact_urls(&self.branch, &self.revision)
                    .await
            })
            .await?;

        let url = urls
            .iter()
            .find(|url| url.rsplit('/').next() == Some(name))
            .ok_or_else(|| PushLensError::ArtifactNotFound {
                name: name.to_string(),
                revision: self.revision.clone(),
            })?;

        debug!("Fetching {url}");
        self.source.fetch_artifact(url).await
    }
}

fn parse_target_tasks(artifact: &Value) -> Result<BTreeSet<String>> {
    let labels = artifact
        .as_array()
        .ok_or_else(|| malformed(TARGET_TASKS_ARTIFACT, "expected a list of labels"))?;

    labels
        .iter()
        .map(|label| {
            label
                .as_str()
                .map(ToString::to_string)
                .ok_or_else(|| malformed(TARGET_TASKS_ARTIFACT, "label is not a string"))
        })
        .collect()
}

fn parse_task_graph(artifact: &Value) -> Result<BTreeSet<String>> {
    let tasks = artifact
        .as_object()
        .ok_or_else(|| malformed(TASK_GRAPH_ARTIFACT, "expected a map of task ids"))?;

    tasks
        .iter()
        .map(|(task_id, task)| {
            task.get("label")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| malformed(TASK_GRAPH_ARTIFACT, &format!("task {task_id} has no label")))
        })
        .collect()
}

fn malformed(name: &str, reason: &str) -> PushLensError {
    PushLensError::MalformedArtifact {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
