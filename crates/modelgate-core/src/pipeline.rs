//! Stage entry points.
//!
//! `identify` and `filter` run as separate invocations; the commit record in
//! the artifacts directory is the only thing they share.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::{BuildRef, DeployableModelList};
use crate::error::Result;
use crate::filter::DeployableFilter;
use crate::record::{load_committed_scripts, record_commit_items};
use crate::source::ChangeSource;
use crate::writer::write_deployable_list;

/// Outcome of the `identify` stage.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyReport {
    pub build: BuildRef,
    pub items: usize,
    pub record_path: PathBuf,
}

/// Outcome of the `filter` stage.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    /// Distinct committed scripts found in the record.
    pub committed_scripts: usize,
    pub deployables: DeployableModelList,
    pub output_path: PathBuf,
}

/// List the changes of `build` and record them for the `filter` stage.
pub async fn identify_commit_items(
    source: &dyn ChangeSource,
    build: &BuildRef,
    config: &PipelineConfig,
) -> Result<IdentifyReport> {
    config.validate()?;

    info!(build = %build, "Retrieving changes made on build");
    let items = source.list_changed_paths(build).await?;

    let record_path = config.commit_items_path();
    record_commit_items(&record_path, &items, config.record_format)?;

    info!(build = %build, items = items.len(), "Commit items recorded");
    Ok(IdentifyReport {
        build: build.clone(),
        items: items.len(),
        record_path,
    })
}

/// Load the commit record, filter deployable models, and write the list.
pub fn filter_deployable_models(config: &PipelineConfig) -> Result<FilterReport> {
    config.validate()?;

    let committed = load_committed_scripts(&config.commit_items_path(), &config.rules)?;

    let filter = DeployableFilter::new(&config.repo_root, config.rules.clone());
    let deployables = filter.filter(&committed)?;

    let output_path = config.deployables_path();
    write_deployable_list(&output_path, &deployables)?;

    info!(
        committed = committed.len(),
        deployable = deployables.len(),
        models = ?deployables.as_slice(),
        "Deployable models identified"
    );
    Ok(FilterReport {
        committed_scripts: committed.len(),
        deployables,
        output_path,
    })
}
