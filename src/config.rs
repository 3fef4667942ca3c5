use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::providers::mozilla::Endpoints;
use crate::push::DEFAULT_MAX_DEPTH;

/// Configuration file structure for pushlens.
///
/// Holds the service endpoints and the analysis defaults so they do not have
/// to be repeated on every invocation. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub hgmo: HgmoConfig,

    #[serde(default)]
    pub activedata: ActiveDataConfig,

    #[serde(default)]
    pub taskcluster: TaskclusterConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HgmoConfig {
    /// Mercurial server root
    #[serde(default = "default_hgmo_base_url")]
    pub base_url: String,

    /// Path between the root and the branch name; empty for top-level repos
    #[serde(default = "default_repo_prefix")]
    pub repo_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActiveDataConfig {
    #[serde(default = "default_activedata_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskclusterConfig {
    #[serde(default = "default_taskcluster_root_url")]
    pub root_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalysisConfig {
    /// Branch analyzed when none is given on the command line
    #[serde(default = "default_branch")]
    pub branch: String,

    /// How many ancestor pushes to search for a passing run of a label
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Concurrent task fetches when analyzing a range of pushes
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Csv,
}

impl Default for HgmoConfig {
    fn default() -> Self {
        Self {
            base_url: default_hgmo_base_url(),
            repo_prefix: default_repo_prefix(),
        }
    }
}

impl Default for ActiveDataConfig {
    fn default() -> Self {
        Self {
            url: default_activedata_url(),
        }
    }
}

impl Default for TaskclusterConfig {
    fn default() -> Self {
        Self {
            root_url: default_taskcluster_root_url(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_hgmo_base_url() -> String {
    "https://hg.mozilla.org".to_string()
}

fn default_repo_prefix() -> String {
    "integration".to_string()
}

fn default_activedata_url() -> String {
    "https://activedata.allizom.org/query".to_string()
}

fn default_taskcluster_root_url() -> String {
    "https://firefox-ci-tc.services.mozilla.com".to_string()
}

fn default_branch() -> String {
    "autoland".to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_concurrency() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./pushlens.toml
    /// 3. ./pushlens.json
    /// 4. ./pushlens.yaml
    /// 5. ./pushlens.yml
    ///
    /// Returns default configuration if no path is given and no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "pushlens.toml",
            "pushlens.json",
            "pushlens.yaml",
            "pushlens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            hgmo_url: self.hgmo.base_url.clone(),
            repo_prefix: self.hgmo.repo_prefix.clone(),
            activedata_url: self.activedata.url.clone(),
            taskcluster_url: self.taskcluster.root_url.clone(),
        }
    }
}
