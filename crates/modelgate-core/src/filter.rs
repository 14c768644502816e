//! Deployable filter: committed scripts -> persistent-table models.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::domain::{CommittedPathSet, DeployableModelList};
use crate::error::{DeployError, Result};
use crate::rules::{MissingModelPolicy, SelectionRules};

/// Filters committed script paths down to deployable model scripts.
///
/// Candidate paths are resolved against `repo_root`, which must be a checkout
/// of the same commit state the record was produced from.
#[derive(Debug, Clone)]
pub struct DeployableFilter {
    repo_root: PathBuf,
    rules: SelectionRules,
}

impl DeployableFilter {
    pub fn new(repo_root: impl Into<PathBuf>, rules: SelectionRules) -> Self {
        Self {
            repo_root: repo_root.into(),
            rules,
        }
    }

    /// Keep paths under the models directory whose content carries the marker.
    ///
    /// Output order follows the (sorted) iteration order of `committed`.
    pub fn filter(&self, committed: &CommittedPathSet) -> Result<DeployableModelList> {
        info!(candidates = committed.len(), "Filtering deployable models");

        let mut deployable = DeployableModelList::new();
        for script in committed.iter() {
            if !self.rules.is_model_path(script) {
                debug!(path = %script, "Not a model script");
                continue;
            }

            let content = match self.read_model(script) {
                Ok(content) => content,
                Err(DeployError::NotFound { path })
                    if self.rules.missing == MissingModelPolicy::Skip =>
                {
                    warn!(path = %path.display(), "Model script missing from checkout, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.rules.is_marked(&content) {
                debug!(path = %script, "Deployable");
                deployable.push(script);
            } else {
                debug!(path = %script, marker = %self.rules.marker, "Marker absent");
            }
        }

        Ok(deployable)
    }

    /// Read a model script fully. The file handle is closed before returning.
    fn read_model(&self, script: &str) -> Result<String> {
        let resolved = self.repo_root.join(script);
        let bytes = std::fs::read(&resolved).map_err(|e| match DeployError::from_io(&resolved, e) {
            DeployError::NotFound { .. } => DeployError::NotFound {
                path: PathBuf::from(script),
            },
            other => other,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
