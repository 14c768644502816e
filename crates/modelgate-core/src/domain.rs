//! Records exchanged between pipeline stages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One file touched by one commit within a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitItem {
    /// Opaque commit identifier (e.g. a git SHA).
    pub commit_id: String,

    /// Repository-relative path, usually of the form `./dir/file.sql`.
    pub path: String,
}

impl CommitItem {
    pub fn new(commit_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
            path: path.into(),
        }
    }
}

/// The build whose changes are being listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRef {
    /// Build identifier assigned by the CI service.
    pub id: String,

    /// Human-readable build number, when the CI service provides one.
    pub number: Option<String>,
}

impl BuildRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number: None,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }
}

impl std::fmt::Display for BuildRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.number {
            Some(number) => write!(f, "{} ({})", self.id, number),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Deduplicated script paths committed in a build.
///
/// Iteration is lexicographic so the downstream list is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommittedPathSet(BTreeSet<String>);

impl CommittedPathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path; returns `false` if it was already present.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.0.insert(path.into())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CommittedPathSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Ordered model scripts that are safe to deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployableModelList(Vec<String>);

impl DeployableModelList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.0.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for DeployableModelList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_set_dedups_and_sorts() {
        let set: CommittedPathSet = ["./models/b.sql", "./models/a.sql", "./models/b.sql"]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec!["./models/a.sql", "./models/b.sql"]
        );
    }

    #[test]
    fn build_ref_display_includes_number() {
        assert_eq!(BuildRef::new("42").to_string(), "42");
        assert_eq!(
            BuildRef::new("42").with_number("20240101.3").to_string(),
            "42 (20240101.3)"
        );
    }

    #[test]
    fn commit_item_json_shape() {
        let item = CommitItem::new("abc123", "./models/x.sql");
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"commit_id":"abc123","path":"./models/x.sql"}"#);
    }
}
