use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::core::MozillaClient;
use crate::error::{PushLensError, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexedTask {
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactList {
    artifacts: Vec<Artifact>,
    continuation_token: Option<String>,
}

#[derive(Deserialize)]
struct Artifact {
    name: String,
}

fn decision_index(branch: &str, revision: &str) -> String {
    format!("gecko.v2.{branch}.revision.{revision}.taskgraph.decision")
}

impl MozillaClient {
    fn taskcluster_api(&self, path: &str) -> Result<Url> {
        self.taskcluster_url
            .join(path)
            .map_err(|e| PushLensError::Config(format!("Invalid Taskcluster URL: {e}")))
    }

    async fn find_decision_task(&self, branch: &str, revision: &str) -> Result<String> {
        let url = self.taskcluster_api(&format!(
            "api/index/v1/task/{}",
            decision_index(branch, revision)
        ))?;

        match self.get_json::<IndexedTask>(url).await {
            Ok(task) => Ok(task.task_id),
            Err(PushLensError::ApiError { status: 404, .. }) => {
                Err(PushLensError::DecisionTaskNotFound {
                    branch: branch.to_string(),
                    revision: revision.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Lists artifact URLs of the decision task that scheduled a push.
    pub async fn fetch_decision_artifact_urls(
        &self,
        branch: &str,
        revision: &str,
    ) -> Result<Vec<String>> {
        let task_id = self.find_decision_task(branch, revision).await?;
        log::debug!("Decision task for {branch}:{revision} is {task_id}");

        let mut urls = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut url = self.taskcluster_api(&format!("api/queue/v1/task/{task_id}/artifacts"))?;
            if let Some(token) = &continuation {
                url.query_pairs_mut().append_pair("continuationToken", token);
            }

            let page: ArtifactList = self.get_json(url).await?;
            for artifact in page.artifacts {
                urls.push(format!(
                    "{}api/queue/v1/task/{task_id}/artifacts/{}",
                    self.taskcluster_url, artifact.name
                ));
            }

            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(urls)
    }

    /// Downloads and parses a JSON artifact.
    pub async fn fetch_json_artifact(&self, url: &str) -> Result<Value> {
        let url = Url::parse(url)
            .map_err(|e| PushLensError::Config(format!("Invalid artifact URL '{url}': {e}")))?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Endpoints;
    use super::*;

    fn client(base: &str) -> MozillaClient {
        MozillaClient::new(&Endpoints {
            hgmo_url: base.to_string(),
            repo_prefix: "integration".to_string(),
            activedata_url: format!("{base}/query"),
            taskcluster_url: base.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_decision_index() {
        assert_eq!(
            decision_index("autoland", "abc"),
            "gecko.v2.autoland.revision.abc.taskgraph.decision"
        );
    }

    #[tokio::test]
    async fn test_fetch_decision_artifact_urls_follows_continuation() {
        let mut server = mockito::Server::new_async().await;
        let index = server
            .mock(
                "GET",
                "/api/index/v1/task/gecko.v2.autoland.revision.abc.taskgraph.decision",
            )
            .with_status(200)
            .with_body(r#"{"namespace": "x", "taskId": "T1"}"#)
            .create_async()
            .await;
        let first_page = server
            .mock("GET", "/api/queue/v1/task/T1/artifacts")
            .match_query(mockito::Matcher::Missing)
            .with_status(200)
            .with_body(
                r#"{"artifacts": [{"name": "public/target-tasks.json"}], "continuationToken": "next"}"#,
            )
            .create_async()
            .await;
        let second_page = server
            .mock("GET", "/api/queue/v1/task/T1/artifacts")
            .match_query(mockito::Matcher::UrlEncoded(
                "continuationToken".into(),
                "next".into(),
            ))
            .with_status(200)
            .with_body(r#"{"artifacts": [{"name": "public/task-graph.json"}]}"#)
            .create_async()
            .await;

        let urls = client(&server.url())
            .fetch_decision_artifact_urls("autoland", "abc")
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with("/api/queue/v1/task/T1/artifacts/public/target-tasks.json"));
        assert!(urls[1].ends_with("/task-graph.json"));
        index.assert_async().await;
        first_page.assert_async().await;
        second_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_decision_task() {
        let mut server = mockito::Server::new_async().await;
        let _index = server
            .mock(
                "GET",
                "/api/index/v1/task/gecko.v2.autoland.revision.abc.taskgraph.decision",
            )
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server.url())
            .fetch_decision_artifact_urls("autoland", "abc")
            .await
            .unwrap_err();

        assert!(matches!(err, PushLensError::DecisionTaskNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_json_artifact() {
        let mut server = mockito::Server::new_async().await;
        let _artifact = server
            .mock("GET", "/artifacts/public/target-tasks.json")
            .with_status(200)
            .with_body(r#"["test-a", "test-b"]"#)
            .create_async()
            .await;

        let value = client(&server.url())
            .fetch_json_artifact(&format!("{}/artifacts/public/target-tasks.json", server.url()))
            .await
            .unwrap();

        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}
