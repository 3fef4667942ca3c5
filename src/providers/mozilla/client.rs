mod activedata;
mod core;
mod hgmo;
mod taskcluster;

use serde_json::Value;

use crate::error::Result;
use crate::push::{CiSource, PushMetadata};

pub use self::core::{Endpoints, MozillaClient};
pub use hgmo::PushEntry;

impl CiSource for MozillaClient {
    async fn push_metadata(&self, branch: &str, revision: &str) -> Result<PushMetadata> {
        self.fetch_revision(branch, revision).await
    }

    async fn task_records(&self, branch: &str, revision: &str) -> Result<Vec<Value>> {
        self.fetch_task_records(branch, revision).await
    }

    async fn decision_artifact_urls(&self, branch: &str, revision: &str) -> Result<Vec<String>> {
        self.fetch_decision_artifact_urls(branch, revision).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Value> {
        self.fetch_json_artifact(url).await
    }
}
