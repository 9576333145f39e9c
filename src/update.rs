//! Backup and overwrite of the target file.
//!
//! The pre-patch content is always written to the history directory before
//! the target is replaced, and the replacement itself is atomic (tempfile in
//! the same directory, fsync, rename), so a crash leaves either the old or
//! the new file, never a partial one.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Same-timestamp backups get a numeric suffix; give up after this many.
const MAX_BACKUP_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("target path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("could not find a free backup name for {} in {}", file.display(), dir.display())]
    BackupNameExhausted { file: PathBuf, dir: PathBuf },
}

impl UpdateError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| UpdateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Writes backups into a history directory and replaces target files.
#[derive(Debug, Clone)]
pub struct FileUpdater {
    history_dir: PathBuf,
}

impl FileUpdater {
    /// Create the updater, creating `history_dir` if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self, UpdateError> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir).map_err(UpdateError::io(&history_dir))?;
        Ok(Self { history_dir })
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Back up `content`, then atomically replace `target` with `new_content`.
    ///
    /// Returns the backup path.
    pub fn commit(
        &self,
        target: &Path,
        content: &str,
        new_content: &str,
    ) -> Result<PathBuf, UpdateError> {
        let backup_path = self.backup(target, content)?;
        atomic_write(target, new_content.as_bytes())?;
        info!(
            file = %target.display(),
            backup = %backup_path.display(),
            "target file updated"
        );
        Ok(backup_path)
    }

    /// Write `content` verbatim to `<history_dir>/<name>.<timestamp>.bak`.
    pub fn backup(&self, target: &Path, content: &str) -> Result<PathBuf, UpdateError> {
        let file_name = target
            .file_name()
            .ok_or_else(|| UpdateError::NoFileName(target.to_path_buf()))?
            .to_string_lossy();
        let now = Utc::now();

        for attempt in 0..MAX_BACKUP_ATTEMPTS {
            let path = self
                .history_dir
                .join(backup_file_name(&file_name, now, attempt));
            // create_new makes the collision check and the create one step.
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(UpdateError::io(&path)(e)),
            };
            file.write_all(content.as_bytes())
                .map_err(UpdateError::io(&path))?;
            file.sync_all().map_err(UpdateError::io(&path))?;
            debug!(backup = %path.display(), "backup written");
            return Ok(path);
        }

        Err(UpdateError::BackupNameExhausted {
            file: target.to_path_buf(),
            dir: self.history_dir.clone(),
        })
    }
}

/// `<name>.<YYYYmmddHHMMSSffffff>.bak`, with `-<n>` before `.bak` on retry.
/// The timestamp sorts lexically in time order.
pub fn backup_file_name(file_name: &str, timestamp: DateTime<Utc>, attempt: usize) -> String {
    let stamp = timestamp.format("%Y%m%d%H%M%S%6f");
    if attempt == 0 {
        format!("{file_name}.{stamp}.bak")
    } else {
        format!("{file_name}.{stamp}-{attempt}.bak")
    }
}

/// Atomic file write: tempfile + fsync + rename, keeping the target's
/// permissions, then bump mtime.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), UpdateError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(UpdateError::io(parent))?;
    temp.write_all(content).map_err(UpdateError::io(temp.path()))?;

    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(UpdateError::io(path))?;
    }

    temp.as_file().sync_all().map_err(UpdateError::io(path))?;
    temp.persist(path).map_err(|e| UpdateError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now).map_err(UpdateError::io(path))?;

    Ok(())
}
