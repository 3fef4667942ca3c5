use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Revision metadata as reported by the source-control host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMetadata {
    /// Monotonic ordinal of the push containing the revision
    pub pushid: u64,
    /// Parent revisions of the commit (more than one for merges)
    #[serde(default)]
    pub parents: Vec<String>,
    /// Revision of the commit backing this one out, if any
    #[serde(default, deserialize_with = "empty_as_none")]
    pub backedoutby: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Everything the push model needs from the outside world.
///
/// Implementations own transport concerns such as retries and caching; the
/// push model only sees data or a terminal error.
pub trait CiSource: Send + Sync {
    /// Metadata for `revision` on `branch`.
    fn push_metadata(
        &self,
        branch: &str,
        revision: &str,
    ) -> impl Future<Output = Result<PushMetadata>> + Send;

    /// Raw task rows for every run on the push, retriggers included.
    fn task_records(
        &self,
        branch: &str,
        revision: &str,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// URLs of every artifact published by the push's decision task.
    fn decision_artifact_urls(
        &self,
        branch: &str,
        revision: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// JSON body of an artifact.
    fn fetch_artifact(&self, url: &str) -> impl Future<Output = Result<Value>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_empty_backedoutby_is_none() {
        let meta: PushMetadata = serde_json::from_str(
            r#"{"pushid": 42, "parents": ["abc"], "backedoutby": "", "node": "def"}"#,
        )
        .unwrap();

        assert_eq!(meta.pushid, 42);
        assert_eq!(meta.parents, vec!["abc".to_string()]);
        assert!(meta.backedoutby.is_none());
    }

    #[test]
    fn test_metadata_missing_fields_default() {
        let meta: PushMetadata = serde_json::from_str(r#"{"pushid": 1}"#).unwrap();
        assert!(meta.parents.is_empty());
        assert!(meta.backedoutby.is_none());
    }

    #[test]
    fn test_metadata_backedoutby_present() {
        let meta: PushMetadata =
            serde_json::from_str(r#"{"pushid": 7, "backedoutby": "0123abcd"}"#).unwrap();
        assert_eq!(meta.backedoutby.as_deref(), Some("0123abcd"));
    }
}
