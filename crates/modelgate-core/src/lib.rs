//! modelgate core
//!
//! Resolves the files changed in a build into the list of model scripts that
//! are safe to deploy:
//!
//! 1. `identify`: a [`ChangeSource`] lists (commit, path) pairs, which are
//!    written to the intermediate commit record.
//! 2. `filter`: the record is loaded and deduplicated, paths outside the
//!    models directory or without the persistent-table marker are dropped,
//!    and the remainder is written as the deployable list.

pub mod config;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod rules;
pub mod source;
pub mod telemetry;
pub mod writer;

pub use config::{PipelineConfig, COMMIT_ITEMS_FILE, DEPLOYABLES_FILE};
pub use domain::{BuildRef, CommitItem, CommittedPathSet, DeployableModelList};
pub use error::{DeployError, Result};
pub use filter::DeployableFilter;
pub use pipeline::{filter_deployable_models, identify_commit_items, FilterReport, IdentifyReport};
pub use record::{load_committed_scripts, read_commit_items, record_commit_items, RecordFormat};
pub use rules::{MaterializationDetection, MissingModelPolicy, PathMatching, SelectionRules};
pub use source::ChangeSource;
pub use telemetry::init_tracing;
pub use writer::write_deployable_list;
