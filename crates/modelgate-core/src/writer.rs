//! Deployable-list output.

use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::DeployableModelList;
use crate::error::{DeployError, Result};

/// Write `list` to `path`, one path per line, replacing any existing file.
///
/// An empty list produces a zero-byte file.
pub fn write_deployable_list(path: &Path, list: &DeployableModelList) -> Result<()> {
    info!(path = %path.display(), models = list.len(), "Saving deployable model scripts");

    let mut buf = String::new();
    for script in list.iter() {
        buf.push_str(script);
        buf.push('\n');
    }

    write_atomic(path, buf.as_bytes())
}

/// Replace `path` with `data` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let io_err = |e: io::Error| DeployError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(data).map_err(io_err)?;
    // The temp file starts out owner-only; the rename must not narrow access.
    if let Some(perms) = target_permissions(path).map_err(io_err)? {
        tmp.as_file().set_permissions(perms).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

/// Permissions the replaced file should end up with: those of the existing
/// target, or the usual 0644 for a new file.
fn target_permissions(path: &Path) -> io::Result<Option<Permissions>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
