//! In-memory `CiSource` used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};

use crate::error::{PushLensError, Result};

use super::source::{CiSource, PushMetadata};

#[derive(Default)]
pub struct FakeSource {
    metadata: HashMap<String, PushMetadata>,
    tasks: HashMap<String, Vec<Value>>,
    artifacts: HashMap<String, Value>,
    pub metadata_calls: AtomicUsize,
    pub task_calls: AtomicUsize,
    pub artifact_list_calls: AtomicUsize,
    pub artifact_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a revision with its push id and parent revisions.
    pub fn revision(mut self, revision: &str, pushid: u64, parents: &[&str]) -> Self {
        self.metadata.insert(
            revision.to_string(),
            PushMetadata {
                pushid,
                parents: parents.iter().map(ToString::to_string).collect(),
                backedoutby: None,
            },
        );
        self
    }

    pub fn backed_out_by(mut self, revision: &str, by: &str) -> Self {
        if let Some(meta) = self.metadata.get_mut(revision) {
            meta.backedoutby = Some(by.to_string());
        }
        self
    }

    /// Adds one task run as `(label, result, classification)` with a 1h duration.
    pub fn task(self, revision: &str, label: &str, result: &str, classification: &str) -> Self {
        self.raw_task(
            revision,
            json!({
                "label": label,
                "duration": 3600,
                "result": result,
                "classification": classification,
            }),
        )
    }

    pub fn raw_task(mut self, revision: &str, raw: Value) -> Self {
        self.tasks.entry(revision.to_string()).or_default().push(raw);
        self
    }

    /// Publishes a decision artifact for `revision`.
    pub fn artifact(mut self, revision: &str, name: &str, body: Value) -> Self {
        self.artifacts.insert(artifact_url(revision, name), body);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn artifact_url(revision: &str, name: &str) -> String {
    format!("https://artifacts.test/{revision}/public/{name}")
}

impl CiSource for FakeSource {
    async fn push_metadata(&self, _branch: &str, revision: &str) -> Result<PushMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .get(revision)
            .cloned()
            .ok_or_else(|| PushLensError::ApiError {
                status: 404,
                message: format!("unknown revision {revision}"),
            })
    }

    async fn task_records(&self, _branch: &str, revision: &str) -> Result<Vec<Value>> {
        self.task_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tasks.get(revision).cloned().unwrap_or_default())
    }

    async fn decision_artifact_urls(&self, _branch: &str, revision: &str) -> Result<Vec<String>> {
        self.artifact_list_calls.fetch_add(1, Ordering::SeqCst);
        let prefix = format!("https://artifacts.test/{revision}/");
        Ok(self
            .artifacts
            .keys()
            .filter(|url| url.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Value> {
        self.artifact_calls.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| PushLensError::ApiError {
                status: 404,
                message: format!("unknown artifact {url}"),
            })
    }
}
