use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{PushLensError, Result};
use crate::push::{CiSource, PushMetadata};

/// Task record cache for one branch.
///
/// Task results of a finished push do not change, so the raw rows are kept
/// per revision in a JSON file under the platform cache directory:
/// - Linux: `~/.cache/pushlens/tasks/{branch}.json`
/// - macOS: `~/Library/Caches/pushlens/tasks/{branch}.json`
///
/// The file is loaded into memory once; new entries are written back by `save`.
pub struct TaskCache {
    cache_file: PathBuf,
    revisions: Mutex<HashMap<String, Vec<Value>>>,
    enabled: bool,
}

fn cache_dir() -> Result<PathBuf> {
    Ok(dirs::cache_dir()
        .ok_or_else(|| PushLensError::Cache("No cache directory found".into()))?
        .join("pushlens")
        .join("tasks"))
}

/// Branches like `releases/mozilla-beta` map to one flat file.
fn cache_file_name(branch: &str) -> String {
    format!("{}.json", branch.replace('/', "-"))
}

impl TaskCache {
    /// Opens the cache for `branch`, loading existing entries from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be determined or created.
    pub fn new(branch: &str, enabled: bool) -> Result<Self> {
        if !enabled {
            debug!("Task cache disabled");
            return Ok(Self::disabled());
        }

        Self::open_in(&cache_dir()?, branch)
    }

    pub fn disabled() -> Self {
        Self {
            cache_file: PathBuf::new(),
            revisions: Mutex::new(HashMap::new()),
            enabled: false,
        }
    }

    fn open_in(dir: &Path, branch: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let cache_file = dir.join(cache_file_name(branch));

        let revisions = if cache_file.exists() {
            fs::read_to_string(&cache_file)
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok())
                .inspect(|_| debug!("Loaded cache from: {}", cache_file.display()))
                .unwrap_or_else(|| {
                    warn!("Failed to load cache, starting with empty cache");
                    HashMap::new()
                })
        } else {
            HashMap::new()
        };

        info!("Task cache enabled at: {}", cache_file.display());

        Ok(Self {
            cache_file,
            revisions: Mutex::new(revisions),
            enabled: true,
        })
    }

    pub fn get(&self, revision: &str) -> Option<Vec<Value>> {
        if !self.enabled {
            return None;
        }

        let revisions = self.revisions.lock().ok()?;
        revisions.get(revision).inspect(|_| debug!("Cache hit for {revision}")).cloned()
    }

    pub fn insert(&self, revision: &str, records: &[Value]) {
        if !self.enabled {
            return;
        }

        if let Ok(mut revisions) = self.revisions.lock() {
            revisions.insert(revision.to_string(), records.to_vec());
        }
    }

    /// Writes every cached revision back to disk.
    pub fn save(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let revisions = self
            .revisions
            .lock()
            .map_err(|_| PushLensError::Cache("Cache lock poisoned".into()))?;
        let content = serde_json::to_string(&*revisions)?;
        fs::write(&self.cache_file, content)?;

        debug!(
            "Saved {} revisions to cache: {}",
            revisions.len(),
            self.cache_file.display()
        );

        Ok(())
    }

    /// Removes the cache file of `branch`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file cannot be removed.
    pub fn clear_branch_cache(branch: &str) -> Result<()> {
        let cache_file = cache_dir()?.join(cache_file_name(branch));

        if cache_file.exists() {
            fs::remove_file(&cache_file)?;
            info!("Cache cleared: {}", cache_file.display());
        } else {
            info!("No cache file found for branch: {branch}");
        }

        Ok(())
    }
}

/// A `CiSource` that serves task records from a `TaskCache` when possible.
pub struct CachedSource<S> {
    inner: S,
    cache: TaskCache,
}

impl<S: CiSource> CachedSource<S> {
    pub fn new(inner: S, cache: TaskCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }
}

impl<S: CiSource> CiSource for CachedSource<S> {
    async fn push_metadata(&self, branch: &str, revision: &str) -> Result<PushMetadata> {
        self.inner.push_metadata(branch, revision).await
    }

    async fn task_records(&self, branch: &str, revision: &str) -> Result<Vec<Value>> {
        if let Some(records) = self.cache.get(revision) {
            return Ok(records);
        }

        let records = self.inner.task_records(branch, revision).await?;
        self.cache.insert(revision, &records);
        Ok(records)
    }

    async fn decision_artifact_urls(&self, branch: &str, revision: &str) -> Result<Vec<String>> {
        self.inner.decision_artifact_urls(branch, revision).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Value> {
        self.inner.fetch_artifact(url).await
    }
}
