//! Directory mirroring: replay a local file or tree under a remote root, or
//! remove what a previous copy created.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::application::ports::FileChannel;
use crate::domain::{MirrorError, RemoteError};

/// One local entry and the remote path it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    pub local: PathBuf,
    pub remote: PathBuf,
    pub is_dir: bool,
}

/// A removal that failed during [`delete`]. Never fatal.
#[derive(Debug)]
pub struct MirrorWarning {
    pub path: PathBuf,
    pub error: RemoteError,
}

impl fmt::Display for MirrorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot delete `{}`: {}", self.path.display(), self.error)
    }
}

/// Walk `local` in file-name order, parents before children, and map every
/// entry under `remote_root`.
///
/// The start point keeps its own name: `static/css/a.css` copied into
/// `/srv/app` maps to `/srv/app/static/css/a.css`.
///
/// # Errors
///
/// Returns `MirrorError::Local` if the tree cannot be read.
pub fn plan(local: &Path, remote_root: &Path) -> Result<Vec<MirrorEntry>, MirrorError> {
    let start = if local.file_name().is_some() {
        local.to_path_buf()
    } else {
        std::fs::canonicalize(local).map_err(|e| MirrorError::Local {
            path: local.to_path_buf(),
            reason: e.to_string(),
        })?
    };

    let mut entries = Vec::new();
    // Remote directory opened at each depth of the walk.
    let mut open_dirs: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(&start).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| MirrorError::Local {
            path: e.path().map_or_else(|| start.clone(), Path::to_path_buf),
            reason: e.to_string(),
        })?;
        open_dirs.truncate(entry.depth());
        let parent = open_dirs.last().map_or(remote_root, PathBuf::as_path);
        let remote = parent.join(entry.file_name());
        let is_dir = entry.file_type().is_dir();
        if is_dir {
            open_dirs.push(remote.clone());
        }
        entries.push(MirrorEntry {
            local: entry.into_path(),
            remote,
            is_dir,
        });
    }
    Ok(entries)
}

/// Copy `local` under `remote_root`, creating directories as needed and
/// overwriting files. Returns the number of entries mirrored.
///
/// # Errors
///
/// Stops at the first local or remote failure.
pub fn copy(
    files: &mut impl FileChannel,
    local: &Path,
    remote_root: &Path,
) -> Result<usize, MirrorError> {
    let entries = plan(local, remote_root)?;
    for entry in &entries {
        let remote_error = |source| MirrorError::Remote {
            path: entry.remote.clone(),
            source,
        };
        if entry.is_dir {
            files.create_dir_all(&entry.remote).map_err(remote_error)?;
            continue;
        }
        let mut source = File::open(&entry.local).map_err(|e| MirrorError::Local {
            path: entry.local.clone(),
            reason: e.to_string(),
        })?;
        let written = files
            .write_file(&entry.remote, &mut source)
            .map_err(remote_error)?;
        tracing::debug!(remote = %entry.remote.display(), bytes = written, "file mirrored");
    }
    Ok(entries.len())
}

/// Remove what [`copy`] of `local` created under `remote_root`.
///
/// Files go first, in walk order; directories afterwards, deepest first.
/// Failed removals are returned as warnings and the rest is still attempted.
///
/// # Errors
///
/// Returns `MirrorError::Local` only if the local tree cannot be read.
pub fn delete(
    files: &mut impl FileChannel,
    local: &Path,
    remote_root: &Path,
) -> Result<Vec<MirrorWarning>, MirrorError> {
    let entries = plan(local, remote_root)?;
    let mut warnings = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries {
        if entry.is_dir {
            dirs.push(entry.remote);
        } else if let Err(error) = files.remove_file(&entry.remote) {
            warnings.push(MirrorWarning {
                path: entry.remote,
                error,
            });
        }
    }
    for dir in dirs.into_iter().rev() {
        if let Err(error) = files.remove_dir(&dir) {
            warnings.push(MirrorWarning { path: dir, error });
        }
    }
    Ok(warnings)
}

/// Remove a remote directory only if it is empty.
///
/// # Errors
///
/// Returns `RemoteError::NotEmpty` when entries remain.
pub fn remove_if_empty(files: &mut impl FileChannel, remote: &Path) -> Result<(), RemoteError> {
    files.remove_dir(remote)
}
