//! Change source seam.
//!
//! A `ChangeSource` lists the files touched by every commit of a build.
//! Implementations live outside this crate; an in-memory fake is provided in
//! [`crate::fakes`] for tests.

use async_trait::async_trait;

use crate::domain::{BuildRef, CommitItem};
use crate::error::Result;

/// Lists the files changed in a build.
///
/// Contract: returned paths never contain a line break, and commit ids never
/// contain a comma or line break, so every item can be written in either
/// record format.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// One item per (commit, changed file), commits in build order.
    async fn list_changed_paths(&self, build: &BuildRef) -> Result<Vec<CommitItem>>;
}
