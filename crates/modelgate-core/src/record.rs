//! Intermediate commit-record file: written by `identify`, read by `filter`.
//!
//! Two line encodings exist:
//!
//! - JSON lines: `{"commit_id":"abc123","path":"./models/a.sql"}`
//! - legacy comma records: `abc123,./models/a.sql`
//!
//! The loader detects the encoding per line, so files written by older
//! pipeline versions keep loading.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{CommitItem, CommittedPathSet};
use crate::error::{DeployError, Result};
use crate::rules::SelectionRules;

/// Encoding used when writing the commit record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// One JSON object per line.
    #[default]
    JsonLines,

    /// `<commitId>,<path>` per line.
    Legacy,
}

/// Write `items` to `path`, one line each, replacing any existing file.
pub fn record_commit_items(path: &Path, items: &[CommitItem], format: RecordFormat) -> Result<()> {
    info!(path = %path.display(), items = items.len(), ?format, "Saving commit items");

    let mut buf = String::new();
    for item in items {
        match format {
            RecordFormat::JsonLines => {
                let line = serde_json::to_string(item).map_err(|e| DeployError::UnencodableItem {
                    commit_id: item.commit_id.clone(),
                    item_path: item.path.clone(),
                    reason: e.to_string(),
                })?;
                buf.push_str(&line);
            }
            RecordFormat::Legacy => {
                check_legacy_encodable(item)?;
                buf.push_str(&item.commit_id);
                buf.push(',');
                buf.push_str(&item.path);
            }
        }
        buf.push('\n');
    }

    crate::writer::write_atomic(path, buf.as_bytes())
}

fn check_legacy_encodable(item: &CommitItem) -> Result<()> {
    let reason = if item.commit_id.contains(',') {
        Some("commit id contains ','")
    } else if item.commit_id.contains(['\n', '\r']) {
        Some("commit id contains a line break")
    } else if item.path.contains(['\n', '\r']) {
        Some("path contains a line break")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DeployError::UnencodableItem {
            commit_id: item.commit_id.clone(),
            item_path: item.path.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Parse one non-blank record line.
///
/// `Err` carries the reason only; the caller adds file and line context.
pub fn parse_record_line(line: &str) -> std::result::Result<CommitItem, String> {
    if line.trim_start().starts_with('{') {
        return serde_json::from_str(line).map_err(|e| format!("invalid JSON record: {e}"));
    }

    match line.split_once(',') {
        Some((commit_id, path)) => Ok(CommitItem::new(commit_id, path)),
        None => Err("missing ',' between commit id and path".to_string()),
    }
}

/// Read every commit item from the record at `path`.
pub fn read_commit_items(path: &Path) -> Result<Vec<CommitItem>> {
    let file = File::open(path).map_err(|e| DeployError::from_io(path, e))?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw.map_err(|e| DeployError::from_io(path, e))?;
        let malformed = |reason: String| DeployError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        };

        let line = String::from_utf8(raw).map_err(|_| malformed("invalid UTF-8".to_string()))?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }

        let item = parse_record_line(line).map_err(malformed)?;
        items.push(item);
    }

    Ok(items)
}

/// Load the committed script paths recorded at `path`, deduplicated.
///
/// Only paths accepted by [`SelectionRules::is_script`] are kept. An empty
/// record yields an empty set.
pub fn load_committed_scripts(path: &Path, rules: &SelectionRules) -> Result<CommittedPathSet> {
    info!(path = %path.display(), "Reading commit items");

    let items = read_commit_items(path)?;
    let total = items.len();

    let mut scripts = CommittedPathSet::new();
    for item in items {
        if !rules.is_script(&item.path) {
            debug!(path = %item.path, "Ignoring non-script change");
            continue;
        }
        if !scripts.insert(item.path.clone()) {
            debug!(path = %item.path, commit = %item.commit_id, "Duplicate script change");
        }
    }

    info!(records = total, scripts = scripts.len(), "Loaded committed scripts");
    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn legacy_line_splits_at_first_comma() {
        let item = parse_record_line("abc123,./models/a,b.sql").unwrap();
        assert_eq!(item.commit_id, "abc123");
        assert_eq!(item.path, "./models/a,b.sql");
    }

    #[test]
    fn json_line_parses() {
        let item = parse_record_line(r#"{"commit_id":"c1","path":"./models/x,y.sql"}"#).unwrap();
        assert_eq!(item, CommitItem::new("c1", "./models/x,y.sql"));
    }

    #[test]
    fn line_without_delimiter_is_rejected() {
        let err = parse_record_line("abc123 ./models/a.sql").unwrap_err();
        assert!(err.contains("missing ','"));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "items.txt", "c1,./models/a.sql\nbroken\n");

        match load_committed_scripts(&path, &SelectionRules::default()) {
            Err(DeployError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "items.txt", "{\"commit_id\":\"c1\"}\n");

        let err = read_commit_items(&path).unwrap_err();
        assert_eq!(err.kind(), "malformed_record");
    }

    #[test]
    fn missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ListOfCommitItems.txt");

        match load_committed_scripts(&path, &SelectionRules::default()) {
            Err(DeployError::NotFound { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "items.txt", "c1,./models/a.sql\r\n\r\n\nc2,./models/b.sql\r\n");

        let scripts = load_committed_scripts(&path, &SelectionRules::default()).unwrap();
        assert_eq!(
            scripts.iter().collect::<Vec<_>>(),
            vec!["./models/a.sql", "./models/b.sql"]
        );
    }

    #[test]
    fn non_utf8_line_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        std::fs::write(&path, b"c1,./models/a.sql\nc2,./models/\xff.sql\n").unwrap();

        match read_commit_items(&path) {
            Err(DeployError::MalformedRecord { line, reason, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(reason, "invalid UTF-8");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn mixed_encodings_load_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "items.txt",
            "c1,./models/a.sql\n{\"commit_id\":\"c2\",\"path\":\"./models/b.sql\"}\n",
        );

        let scripts = load_committed_scripts(&path, &SelectionRules::default()).unwrap();
        assert_eq!(scripts.len(), 2);
    }

    #[test]
    fn legacy_recorder_rejects_comma_in_commit_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        let items = vec![CommitItem::new("a,b", "./models/a.sql")];

        let err = record_commit_items(&path, &items, RecordFormat::Legacy).unwrap_err();
        assert_eq!(err.kind(), "unencodable_item");
        assert!(!path.exists());
    }

    #[test]
    fn legacy_recorder_writes_comma_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        let items = vec![
            CommitItem::new("abc123", "./models/a.sql"),
            CommitItem::new("abc123", "./README.md"),
        ];

        record_commit_items(&path, &items, RecordFormat::Legacy).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "abc123,./models/a.sql\nabc123,./README.md\n"
        );
    }

    #[test]
    fn json_recorder_survives_commas_in_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        let items = vec![CommitItem::new("c1", "./models/odd,name.sql")];

        record_commit_items(&path, &items, RecordFormat::JsonLines).unwrap();
        assert_eq!(read_commit_items(&path).unwrap(), items);
    }
}
