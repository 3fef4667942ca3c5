use serde::Deserialize;
use serde_json::{json, Value};

use super::core::MozillaClient;
use crate::error::Result;

const MAX_RECORDS: usize = 10_000;

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<Value>,
}

/// Query selecting one row per task run of a push.
fn push_results_query(branch: &str, revision: &str) -> Value {
    json!({
        "from": "treeherder",
        "select": [
            {"name": "label", "value": "job.type.name"},
            {"name": "duration", "value": "action.duration"},
            {"name": "result", "value": "job.result"},
            {"name": "classification", "value": "failure.classification"}
        ],
        "where": {"and": [
            {"eq": {"repo.branch.name": branch}},
            {"prefix": {"repo.changeset.id": revision}}
        ]},
        "limit": MAX_RECORDS,
        "format": "list"
    })
}

fn is_truncated(rows: &[Value]) -> bool {
    rows.len() >= MAX_RECORDS
}

impl MozillaClient {
    /// Fetches raw task rows for every run on a push.
    pub async fn fetch_task_records(&self, branch: &str, revision: &str) -> Result<Vec<Value>> {
        let query = push_results_query(branch, revision);
        let response: QueryResponse = self.post_json(self.activedata_url.clone(), &query).await?;

        log::debug!("ActiveData returned {} rows for {revision}", response.data.len());
        if is_truncated(&response.data) {
            log::warn!(
                "ActiveData returned the maximum of {MAX_RECORDS} rows for {revision}; later task runs are missing"
            );
        }
        Ok(response.data)
    }
}
