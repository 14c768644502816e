//! Error taxonomy for the deployable-model pipeline.

use std::path::{Path, PathBuf};

/// Errors produced by the record, filter, and writer stages.
///
/// Every variant aborts the running stage; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed commit record at {}:{line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("commit item {commit_id:?} / {item_path:?} cannot be written as a legacy record: {reason}")]
    UnencodableItem {
        commit_id: String,
        item_path: String,
        reason: String,
    },

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("change source error: {0}")]
    ChangeSource(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DeployError {
    /// Stable tag used when reporting the failure to the invocation log.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::NotFound { .. } => "not_found",
            DeployError::MalformedRecord { .. } => "malformed_record",
            DeployError::UnencodableItem { .. } => "unencodable_item",
            DeployError::Io { .. } => "io_failure",
            DeployError::ChangeSource(_) => "change_source",
            DeployError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Map an I/O error on `path`, promoting `NotFound` to its own variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DeployError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DeployError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_becomes_not_found_variant() {
        let err = DeployError::from_io(
            Path::new("models/a.sql"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, DeployError::NotFound { ref path } if path == Path::new("models/a.sql")));
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn other_io_errors_keep_their_source() {
        let err = DeployError::from_io(
            Path::new("out.txt"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "io_failure");
        assert!(err.to_string().contains("out.txt"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn malformed_record_names_file_and_line() {
        let err = DeployError::MalformedRecord {
            path: PathBuf::from("ListOfCommitItems.txt"),
            line: 3,
            reason: "missing ',' delimiter".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed commit record at ListOfCommitItems.txt:3: missing ',' delimiter"
        );
    }
}
