//! In-memory fakes (testing only)

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{BuildRef, CommitItem};
use crate::error::{DeployError, Result};
use crate::source::ChangeSource;

/// Change source backed by a `HashMap<build id, items>`.
///
/// Unknown builds yield `DeployError::ChangeSource`.
#[derive(Debug, Default)]
pub struct MemoryChangeSource {
    builds: Mutex<HashMap<String, Vec<CommitItem>>>,
}

impl MemoryChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the items returned for `build_id`.
    pub fn with_build(self, build_id: &str, items: Vec<CommitItem>) -> Self {
        self.builds
            .lock()
            .unwrap()
            .insert(build_id.to_string(), items);
        self
    }
}

#[async_trait]
impl ChangeSource for MemoryChangeSource {
    async fn list_changed_paths(&self, build: &BuildRef) -> Result<Vec<CommitItem>> {
        let builds = self.builds.lock().unwrap();
        builds
            .get(&build.id)
            .cloned()
            .ok_or_else(|| DeployError::ChangeSource(format!("unknown build {}", build.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_registered_items() {
        let source = MemoryChangeSource::new()
            .with_build("7", vec![CommitItem::new("c1", "./models/a.sql")]);

        let items = source.list_changed_paths(&BuildRef::new("7")).await.unwrap();
        assert_eq!(items, vec![CommitItem::new("c1", "./models/a.sql")]);
    }

    #[tokio::test]
    async fn unknown_build_is_an_error() {
        let source = MemoryChangeSource::new();
        let err = source.list_changed_paths(&BuildRef::new("8")).await.unwrap_err();
        assert_eq!(err.kind(), "change_source");
    }
}
