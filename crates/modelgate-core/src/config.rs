//! Pipeline configuration, threaded explicitly into each stage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::record::RecordFormat;
use crate::rules::SelectionRules;

/// File name of the intermediate commit record inside the artifacts directory.
pub const COMMIT_ITEMS_FILE: &str = "ListOfCommitItems.txt";

/// File name of the deployable list inside the artifacts directory.
pub const DEPLOYABLES_FILE: &str = "DeployableModels.txt";

/// Locations and rules for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the intermediate record and the deployable list.
    pub artifacts_dir: PathBuf,

    /// Repository checkout that committed paths are resolved against.
    pub repo_root: PathBuf,

    pub commit_items_file: String,
    pub deployables_file: String,
    pub record_format: RecordFormat,
    pub rules: SelectionRules,
}

impl PipelineConfig {
    /// Config with default file names and rules.
    pub fn new(artifacts_dir: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            repo_root: repo_root.into(),
            commit_items_file: COMMIT_ITEMS_FILE.to_string(),
            deployables_file: DEPLOYABLES_FILE.to_string(),
            record_format: RecordFormat::default(),
            rules: SelectionRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: SelectionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_record_format(mut self, format: RecordFormat) -> Self {
        self.record_format = format;
        self
    }

    pub fn commit_items_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.commit_items_file)
    }

    pub fn deployables_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.deployables_file)
    }

    /// Reject configurations whose predicates would match everything.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("script extension", &self.rules.script_extension),
            ("models directory", &self.rules.models_dir),
            ("materialization marker", &self.rules.marker),
            ("commit items file name", &self.commit_items_file),
            ("deployables file name", &self.deployables_file),
        ];
        for (what, value) in checks {
            if value.trim().is_empty() {
                return Err(DeployError::InvalidConfig(format!("{what} must not be empty")));
            }
        }
        if self.commit_items_file == self.deployables_file {
            return Err(DeployError::InvalidConfig(
                "commit items and deployables must be different files".to_string(),
            ));
        }
        Ok(())
    }
}
