use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analyzer::PushAnalyzer;
use crate::config::{Config, OutputFormat};
use crate::output::export_report;
use crate::providers::mozilla::{CachedSource, MozillaClient, TaskCache};
use crate::report::Report;

type MozillaAnalyzer = PushAnalyzer<CachedSource<MozillaClient>>;

#[derive(Parser)]
#[command(name = "pushlens")]
#[command(author, version, about = "CI Regression Inference", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pushlens.{toml,json,yaml,yml})
    #[arg(short, long, global = true, env = "PUSHLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Always fetch task records instead of reading the local cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the regressions introduced by a push
    Regressions {
        #[arg(short, long)]
        revision: String,

        #[arg(short, long, env = "PUSHLENS_BRANCH")]
        branch: Option<String>,

        /// Ancestor pushes searched for a passing run of each failing label
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Compare scheduled tasks with the full target set of a push
    Health {
        #[arg(short, long)]
        revision: String,

        #[arg(short, long, env = "PUSHLENS_BRANCH")]
        branch: Option<String>,
    },
    /// Infer regressions for every push in a date window
    Range {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Day after the window ends (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(short, long, env = "PUSHLENS_BRANCH")]
        branch: Option<String>,
    },
    /// Remove the cached task records of a branch
    ClearCache {
        #[arg(short, long, env = "PUSHLENS_BRANCH")]
        branch: Option<String>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Regressions {
                revision,
                branch,
                max_depth,
            } => {
                let max_depth = max_depth.unwrap_or(config.analysis.max_depth);
                let analyzer = self.analyzer(&config, branch.as_deref(), max_depth)?;
                let report = analyzer.push_report(revision).await?;
                self.finish(&config, &analyzer, &Report::Push(report))
            }
            Commands::Health { revision, branch } => {
                let analyzer =
                    self.analyzer(&config, branch.as_deref(), config.analysis.max_depth)?;
                let report = analyzer.health_report(revision).await?;
                self.finish(&config, &analyzer, &Report::Health(report))
            }
            Commands::Range { from, to, branch } => {
                let analyzer =
                    self.analyzer(&config, branch.as_deref(), config.analysis.max_depth)?;
                let entries = analyzer
                    .source()
                    .inner()
                    .fetch_push_range(analyzer.branch(), *from, *to)
                    .await?;
                info!("Found {} pushes since {from}", entries.len());
                let report = analyzer.range_report(&entries).await?;
                self.finish(&config, &analyzer, &Report::Range(report))
            }
            Commands::ClearCache { branch } => {
                let branch = branch.as_deref().unwrap_or(&config.analysis.branch);
                TaskCache::clear_branch_cache(branch)?;
                Ok(())
            }
        }
    }

    fn analyzer(
        &self,
        config: &Config,
        branch: Option<&str>,
        max_depth: usize,
    ) -> Result<MozillaAnalyzer> {
        let branch = branch.unwrap_or(&config.analysis.branch);
        let client = MozillaClient::new(&config.endpoints())?;
        let cache = TaskCache::new(branch, config.cache.enabled && !self.no_cache)?;

        Ok(PushAnalyzer::new(
            Arc::new(CachedSource::new(client, cache)),
            branch,
            max_depth,
            config.analysis.concurrency,
        ))
    }

    fn finish(&self, config: &Config, analyzer: &MozillaAnalyzer, report: &Report) -> Result<()> {
        analyzer.source().cache().save()?;

        let format = self.format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path).with_context(|| {
                format!("Failed to create output file: {}", output_path.display())
            })?;
            export_report(report, format, pretty, &mut file)?;
            info!("Report written to: {}", output_path.display());
        } else {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            export_report(report, format, pretty, &mut handle)?;
            handle.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_regressions() {
        let cli = Cli::try_parse_from([
            "pushlens",
            "regressions",
            "-r",
            "abc123",
            "-b",
            "mozilla-central",
            "--max-depth",
            "10",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Regressions {
                revision,
                branch,
                max_depth,
            } => {
                assert_eq!(revision, "abc123");
                assert_eq!(branch.as_deref(), Some("mozilla-central"));
                assert_eq!(max_depth, Some(10));
            }
            _ => panic!("expected regressions command"),
        }
    }

    #[test]
    fn test_parse_range_dates() {
        let cli = Cli::try_parse_from(["pushlens", "range", "--from", "2024-03-01"]).unwrap();

        match cli.command {
            Commands::Range { from, to, .. } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
                assert!(to.is_none());
            }
            _ => panic!("expected range command"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        assert!(Cli::try_parse_from(["pushlens", "range", "--from", "yesterday"]).is_err());
    }

    #[test]
    fn test_revision_is_required() {
        assert!(Cli::try_parse_from(["pushlens", "health"]).is_err());
    }
}
