//! On-disk representation: reading with corruption recovery, atomic replace.

use crate::error::{PrefsError, PrefsResult};
use crate::tree::Node;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace, warn};

/// Result of reading the backing file.
#[derive(Debug)]
pub struct LoadedTree {
    pub root: Node,
    /// Modification time of the file that was read, `None` when it was absent.
    pub modified: Option<SystemTime>,
    /// Backup written because the file could not be parsed.
    pub backup: Option<PathBuf>,
}

/// Path of a sibling file named `<file name><suffix>`.
pub fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(suffix);
    path.with_file_name(name)
}

pub fn lock_path_for(path: &Path) -> PathBuf {
    sibling(path, ".lock")
}

/// Read and parse the backing file.
///
/// A missing file yields an empty tree. A file that cannot be parsed is
/// copied to a `.corrupt.` backup and also yields an empty tree.
pub fn read_tree(path: &Path) -> PrefsResult<LoadedTree> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!(
                "Preferences file {} does not exist, starting with empty preferences",
                path.display()
            );
            return Ok(LoadedTree {
                root: Node::new(),
                modified: None,
                backup: None,
            });
        }
        Err(e) => return Err(PrefsError::io(path, e)),
    };

    let modified = file.metadata().and_then(|m| m.modified()).ok();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| PrefsError::io(path, e))?;
    drop(file);

    match Node::from_json_slice(&bytes) {
        Ok(root) => {
            trace!("Loaded preferences from {}", path.display());
            Ok(LoadedTree {
                root,
                modified,
                backup: None,
            })
        }
        Err(parse_error) => {
            let backup = backup_corrupt(path, &bytes)?;
            warn!(
                "Corrupted preferences file detected at {}, reason: {}, backup saved to: {}, starting with empty preferences",
                path.display(),
                parse_error,
                backup.display()
            );
            Ok(LoadedTree {
                root: Node::new(),
                modified,
                backup: Some(backup),
            })
        }
    }
}

/// Write `bytes` to a new `<file>.corrupt.<millis>` sibling.
///
/// Existing backups are never overwritten; a `-<n>` counter is appended
/// until an unused name is found.
pub fn backup_corrupt(path: &Path, bytes: &[u8]) -> PrefsResult<PathBuf> {
    let stamp = chrono::Utc::now().timestamp_millis();
    let base = format!(".corrupt.{}", stamp);
    let mut counter = 0u32;
    loop {
        let suffix = if counter == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, counter)
        };
        let candidate = sibling(path, &suffix);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(bytes)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| PrefsError::io(&candidate, e))?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(PrefsError::io(&candidate, e)),
        }
    }
}

/// Replace `path` with `bytes` through a temp file in the same directory.
///
/// The temp file is removed on every failure path; on success it becomes
/// the target in a single rename. Returns the new modification time.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PrefsResult<Option<SystemTime>> {
    let dir = parent_dir(path);
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prefs".to_string())
    );
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| PrefsError::io(dir, e))?;
    temp.write_all(bytes)
        .map_err(|e| PrefsError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| PrefsError::io(temp.path(), e))?;
    temp.persist(path)
        .map_err(|err| PrefsError::io(path, err.error))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(fs::metadata(path).and_then(|m| m.modified()).ok())
}

/// Directory the backing file lives in, created if missing.
pub fn ensure_parent_dir(path: &Path) -> PrefsResult<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| PrefsError::io(dir, e))
}

pub fn modified_time(path: &Path) -> PrefsResult<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.modified().ok()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PrefsError::io(path, e)),
    }
}

/// Delete a file, treating absence as success. Returns whether it existed.
pub fn remove_if_exists(path: &Path) -> PrefsResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PrefsError::io(path, e)),
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
