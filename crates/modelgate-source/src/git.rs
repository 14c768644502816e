//! Change source backed by a local git checkout.
//!
//! The commits of a build are the revision range `base..head`; without a base
//! only `head` itself is listed. Each commit contributes the files it touched
//! relative to its first parent, including deletions.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use modelgate_core::{BuildRef, ChangeSource, CommitItem, DeployError, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lists build changes by running the `git` CLI in `repo_dir`.
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    repo_dir: PathBuf,
    base: Option<String>,
    head: String,
}

impl GitChangeSource {
    /// Source listing only the `HEAD` commit of `repo_dir`.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            base: None,
            head: "HEAD".to_string(),
        }
    }

    /// Exclusive lower bound of the build's revision range.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    /// Commit SHAs of the build, oldest first.
    pub async fn build_commits(&self) -> Result<Vec<String>> {
        let stdout = match &self.base {
            Some(base) => {
                let range = format!("{base}..{}", self.head);
                self.git(&["rev-list", "--reverse", &range]).await?
            }
            None => {
                let rev = format!("{}^{{commit}}", self.head);
                self.git(&["rev-parse", "--verify", &rev]).await?
            }
        };

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Repository-relative paths touched by `commit`.
    pub async fn commit_paths(&self, commit: &str) -> Result<Vec<String>> {
        let stdout = self
            .git(&[
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "--no-renames",
                "-r",
                "-z",
                "--root",
                commit,
            ])
            .await?;
        Ok(parse_name_list(&stdout))
    }

    async fn git(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!(repo = %self.repo_dir.display(), ?args, "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeployError::ChangeSource(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeployError::ChangeSource(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl ChangeSource for GitChangeSource {
    async fn list_changed_paths(&self, build: &BuildRef) -> Result<Vec<CommitItem>> {
        let commits = self.build_commits().await?;
        info!(build = %build, commits = commits.len(), "Retrieved commits for build");

        let mut items = Vec::new();
        for commit in commits {
            debug!(build = %build, commit = %commit, "Retrieving commit changes");
            for path in self.commit_paths(&commit).await? {
                if path.contains(['\n', '\r']) {
                    warn!(commit = %commit, path = ?path, "Skipping path with a line break");
                    continue;
                }
                items.push(CommitItem::new(commit.clone(), format!("./{path}")));
            }
        }

        Ok(items)
    }
}

/// Split NUL-terminated `git diff-tree -z --name-only` output.
///
/// Names that are not valid UTF-8 cannot be recorded faithfully and are
/// skipped.
fn parse_name_list(stdout: &[u8]) -> Vec<String> {
    stdout
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match String::from_utf8(entry.to_vec()) {
            Ok(name) => Some(name),
            Err(_) => {
                warn!(path = %String::from_utf8_lossy(entry), "Skipping non-UTF-8 path");
                None
            }
        })
        .collect()
}
