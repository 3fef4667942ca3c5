use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PushLensError, Result};

use super::model::Push;
use super::source::CiSource;
use super::summary::Status;

/// Outcome of searching ancestor pushes for the last run of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestorWalk {
    /// The label last ran `distance` pushes back and passed there.
    Found { distance: usize },
    /// The label was already failing on the nearest ancestor that ran it.
    PriorRegression { distance: usize },
    /// The label was not found within `searched` ancestors.
    Exhausted { searched: usize },
}

/// How far back the last passing run of a regressed label is.
///
/// `Known(0)` means the immediate parent ran and passed the label; `Known(n)`
/// means `n` pushes in between never ran it, so any of them may be the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegressionDistance {
    Known(usize),
    Unknown,
}

impl RegressionDistance {
    pub fn is_likely(self) -> bool {
        self == Self::Known(0)
    }
}

impl std::fmt::Display for RegressionDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(distance) => write!(f, "{distance}"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl<S: CiSource> Push<S> {
    /// Failing labels with at least one unexplained failure.
    pub async fn candidate_regressions(&self) -> Result<BTreeSet<&str>> {
        Ok(self
            .label_summaries()
            .await?
            .values()
            .filter(|summary| summary.is_candidate_regression())
            .map(|summary| summary.label())
            .collect())
    }

    /// Searches at most `max_depth` ancestors, nearest first, for a push that
    /// ran `label`.
    pub async fn walk_ancestors(&self, label: &str, max_depth: usize) -> Result<AncestorWalk> {
        let mut ancestor = self.parent().await?;
        let mut depth = 0;

        while let Some(current) = ancestor {
            if depth >= max_depth {
                break;
            }

            if let Some(summary) = current.label_summaries().await?.get(label) {
                debug!(
                    "{label} ran on {} ({depth} back) with results {:?}",
                    current.revision(),
                    summary.results()
                );
                return Ok(if summary.status() == Status::Pass {
                    AncestorWalk::Found { distance: depth }
                } else {
                    AncestorWalk::PriorRegression { distance: depth }
                });
            }

            ancestor = current.parent().await?;
            depth += 1;
        }

        Ok(AncestorWalk::Exhausted { searched: depth })
    }

    /// Labels regressed by this push, with the distance to their last passing run.
    ///
    /// Candidates that were already failing on an earlier push are left out.
    pub async fn regressions(&self) -> Result<&BTreeMap<String, RegressionDistance>> {
        self.regressions
            .get_or_try_init(|| async {
                let mut regressions = BTreeMap::new();

                for label in self.candidate_regressions().await? {
                    match self.walk_ancestors(label, self.max_depth()).await? {
                        AncestorWalk::Found { distance } => {
                            regressions.insert(label.to_string(), RegressionDistance::Known(distance));
                        }
                        AncestorWalk::PriorRegression { distance } => {
                            debug!(
                                "{label} was already failing {distance} pushes before {}",
                                self.revision()
                            );
                        }
                        AncestorWalk::Exhausted { searched } => {
                            debug!("{label} not found in {searched} ancestors of {}", self.revision());
                            regressions.insert(label.to_string(), RegressionDistance::Unknown);
                        }
                    }
                }

                Ok::<_, PushLensError>(regressions)
            })
            .await
    }

    /// Regressions whose label passed on the immediate parent.
    pub async fn likely_regressions(&self) -> Result<BTreeSet<&str>> {
        Ok(self
            .regressions()
            .await?
            .iter()
            .filter(|(_, distance)| distance.is_likely())
            .map(|(label, _)| label.as_str())
            .collect())
    }

    /// Regressions that may have been introduced by an earlier push.
    pub async fn possible_regressions(&self) -> Result<BTreeSet<&str>> {
        Ok(self
            .regressions()
            .await?
            .iter()
            .filter(|(_, distance)| !distance.is_likely())
            .map(|(label, _)| label.as_str())
            .collect())
    }

    /// Regressions detected by a task that was originally scheduled.
    pub async fn regressions_caught(&self) -> Result<BTreeSet<&str>> {
        let scheduled = self.scheduled_task_labels().await?;
        Ok(self
            .regressions()
            .await?
            .keys()
            .filter(|label| scheduled.contains(*label))
            .map(String::as_str)
            .collect())
    }

    /// Regressions only detected by retriggers or backfills.
    pub async fn regressions_missed(&self) -> Result<BTreeSet<&str>> {
        let scheduled = self.scheduled_task_labels().await?;
        Ok(self
            .regressions()
            .await?
            .keys()
            .filter(|label| !scheduled.contains(*label))
            .map(String::as_str)
            .collect())
    }
}
