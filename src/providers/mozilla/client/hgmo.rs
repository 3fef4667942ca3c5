use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use url::Url;

use super::core::MozillaClient;
use crate::error::{PushLensError, Result};
use crate::push::PushMetadata;

/// A push as listed by the `json-pushes` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEntry {
    pub pushid: u64,
    /// Top-most changeset of the push
    pub revision: String,
    pub user: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct JsonPushes {
    pushes: HashMap<String, JsonPush>,
}

#[derive(Deserialize)]
struct JsonPush {
    changesets: Vec<String>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    date: i64,
}

impl MozillaClient {
    /// `{hgmo}/{prefix}/{branch}/` for the configured repository prefix.
    fn repo_url(&self, branch: &str) -> Result<Url> {
        let path = if self.repo_prefix.is_empty() {
            format!("{branch}/")
        } else {
            format!("{}/{branch}/", self.repo_prefix)
        };

        self.hgmo_url
            .join(&path)
            .map_err(|e| PushLensError::Config(format!("Invalid repository URL: {e}")))
    }

    /// Fetches push metadata for a single revision.
    pub async fn fetch_revision(&self, branch: &str, revision: &str) -> Result<PushMetadata> {
        let mut url = self
            .repo_url(branch)?
            .join(&format!("rev/{revision}"))
            .map_err(|e| PushLensError::Config(format!("Invalid revision URL: {e}")))?;
        url.query_pairs_mut().append_pair("style", "json");

        self.get_json(url).await
    }

    /// Lists the pushes made to `branch` between two dates, oldest first.
    pub async fn fetch_push_range(
        &self,
        branch: &str,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PushEntry>> {
        let mut url = self
            .repo_url(branch)?
            .join("json-pushes")
            .map_err(|e| PushLensError::Config(format!("Invalid json-pushes URL: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("version", "2")
                .append_pair("startdate", &from.format("%Y-%m-%d").to_string());
            if let Some(to) = to {
                query.append_pair("enddate", &to.format("%Y-%m-%d").to_string());
            }
        }

        let response: JsonPushes = self.get_json(url).await?;
        Ok(parse_push_entries(response))
    }
}

fn parse_push_entries(response: JsonPushes) -> Vec<PushEntry> {
    let mut entries: Vec<PushEntry> = response
        .pushes
        .into_iter()
        .filter_map(|(id, push)| {
            let pushid = id.parse().ok()?;
            let revision = push.changesets.last()?.clone();
            Some(PushEntry {
                pushid,
                revision,
                user: push.user,
                date: DateTime::from_timestamp(push.date, 0),
            })
        })
        .collect();

    entries.sort_by_key(|entry| entry.pushid);
    entries
}

#[cfg(test)]
mod tests {
    use super::super::core::Endpoints;
    use super::*;

    fn client(base: &str, prefix: &str) -> MozillaClient {
        MozillaClient::new(&Endpoints {
            hgmo_url: base.to_string(),
            repo_prefix: prefix.to_string(),
            activedata_url: format!("{base}/query"),
            taskcluster_url: base.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_repo_url_with_and_without_prefix() {
        let integration = client("https://hg.mozilla.org", "integration");
        assert_eq!(
            integration.repo_url("autoland").unwrap().as_str(),
            "https://hg.mozilla.org/integration/autoland/"
        );

        let central = client("https://hg.mozilla.org", "");
        assert_eq!(
            central.repo_url("mozilla-central").unwrap().as_str(),
            "https://hg.mozilla.org/mozilla-central/"
        );
    }

    #[tokio::test]
    async fn test_fetch_revision() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/integration/autoland/rev/abcdef")
            .match_query(mockito::Matcher::UrlEncoded("style".into(), "json".into()))
            .with_status(200)
            .with_body(
                r#"{"node": "abcdef", "pushid": 1234, "parents": ["012345"], "backedoutby": ""}"#,
            )
            .create_async()
            .await;

        let meta = client(&server.url(), "integration")
            .fetch_revision("autoland", "abcdef")
            .await
            .unwrap();

        assert_eq!(meta.pushid, 1234);
        assert_eq!(meta.parents, vec!["012345".to_string()]);
        assert!(meta.backedoutby.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_push_range_sorted_by_pushid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/integration/autoland/json-pushes")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("version".into(), "2".into()),
                mockito::Matcher::UrlEncoded("startdate".into(), "2019-12-01".into()),
                mockito::Matcher::UrlEncoded("enddate".into(), "2019-12-02".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{
                    "lastpushid": 12,
                    "pushes": {
                        "12": {"changesets": ["c1", "c2"], "date": 1575200000, "user": "b@example.com"},
                        "11": {"changesets": ["a1"], "date": 1575190000, "user": "a@example.com"},
                        "10": {"changesets": [], "date": 1575180000, "user": "a@example.com"}
                    }
                }"#,
            )
            .create_async()
            .await;

        let entries = client(&server.url(), "integration")
            .fetch_push_range(
                "autoland",
                NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2019, 12, 2),
            )
            .await
            .unwrap();

        let revisions: Vec<&str> = entries.iter().map(|e| e.revision.as_str()).collect();
        assert_eq!(revisions, vec!["a1", "c2"]);
        assert_eq!(entries[1].pushid, 12);
        assert_eq!(entries[1].user, "b@example.com");
        assert!(entries[0].date.is_some());
        mock.assert_async().await;
    }
}
