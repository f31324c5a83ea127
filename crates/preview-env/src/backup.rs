//! Entry-file backups
//!
//! The original entry file is held in memory and copied to
//! `temp/backup_<uuid>` before it is overwritten. Restoration first writes
//! the in-memory content back; if that fails the backup copy is copied over
//! the entry file. The original permission bits are re-applied either way.

use crate::error::EnvError;
use crate::layout::StateLayout;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use uuid::Uuid;

const BACKUP_PREFIX: &str = "backup_";

/// Snapshot of the entry file taken before a session replaces it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBackup {
    /// Entry file the snapshot was taken from
    pub original_file_path: PathBuf,
    /// Content at capture time
    pub original_content: Vec<u8>,
    /// Unix permission bits at capture time
    pub original_file_mode: Option<u32>,
    /// Working directory of the session
    pub working_directory: PathBuf,
    /// On-disk copy of [`SessionBackup::original_content`]
    pub backup_file_path: PathBuf,
    /// Capture time
    pub created_at: DateTime<Utc>,
}

/// How the entry file was put back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMethod {
    /// In-memory content written back
    Written,
    /// Backup file copied over the entry file
    Copied,
}

/// Fresh backup location inside `layout`
#[must_use]
pub fn backup_path(layout: &StateLayout) -> PathBuf {
    layout
        .temp_dir()
        .join(format!("{BACKUP_PREFIX}{}", Uuid::new_v4()))
}

impl SessionBackup {
    /// Snapshot `entry_file` into `backup_file`
    ///
    /// Returns `None` when there is no entry file to protect.
    ///
    /// # Errors
    /// `EnvError::Io` when the entry file cannot be read or the copy cannot
    /// be written
    pub fn capture(
        entry_file: &Path,
        backup_file: PathBuf,
        working_directory: &Path,
    ) -> Result<Option<Self>, EnvError> {
        let original_content = match fs::read(entry_file) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EnvError::io("read", entry_file, e)),
        };
        let metadata =
            fs::metadata(entry_file).map_err(|e| EnvError::io("inspect", entry_file, e))?;

        if let Some(parent) = backup_file.parent() {
            fs::create_dir_all(parent).map_err(|e| EnvError::io("create", parent, e))?;
        }
        fs::write(&backup_file, &original_content)
            .map_err(|e| EnvError::io("write", &backup_file, e))?;
        debug!(
            entry = %entry_file.display(),
            backup = %backup_file.display(),
            bytes = original_content.len(),
            "captured entry file backup"
        );

        Ok(Some(Self {
            original_file_path: entry_file.to_path_buf(),
            original_content,
            original_file_mode: file_mode(&metadata),
            working_directory: working_directory.to_path_buf(),
            backup_file_path: backup_file,
            created_at: Utc::now(),
        }))
    }

    /// Put the original content back
    ///
    /// # Errors
    /// `EnvError::Io` for the fallback copy when both attempts failed; the
    /// backup file is left in place in that case
    pub fn restore(&self) -> Result<RestoreMethod, EnvError> {
        restore_file(
            &self.original_file_path,
            Some(&self.original_content),
            &self.backup_file_path,
            self.original_file_mode,
        )
    }

    /// Delete the on-disk backup copy
    pub fn discard(&self) {
        remove_backup(&self.backup_file_path);
    }
}

/// Restore `entry_file` from in-memory content, falling back to a copy of
/// `backup_file`, then re-apply `mode`
///
/// # Errors
/// `EnvError::Io` when neither the write nor the copy succeeded
pub fn restore_file(
    entry_file: &Path,
    content: Option<&[u8]>,
    backup_file: &Path,
    mode: Option<u32>,
) -> Result<RestoreMethod, EnvError> {
    let written = match content {
        Some(content) => match fs::write(entry_file, content) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    entry = %entry_file.display(),
                    error = %e,
                    "writing original content failed, copying backup file"
                );
                false
            }
        },
        None => false,
    };

    let method = if written {
        RestoreMethod::Written
    } else {
        match fs::copy(backup_file, entry_file) {
            Ok(_) => RestoreMethod::Copied,
            Err(e) => {
                error!(
                    entry = %entry_file.display(),
                    backup = %backup_file.display(),
                    error = %e,
                    "failed to restore entry file; original content kept in backup"
                );
                return Err(EnvError::io("restore", entry_file, e));
            }
        }
    };

    if let Some(mode) = mode {
        if let Err(e) = set_file_mode(entry_file, mode) {
            warn!(entry = %entry_file.display(), error = %e, "failed to re-apply file mode");
        }
    }
    Ok(method)
}

/// Remove a backup file, logging failures
pub fn remove_backup(backup_file: &Path) {
    match fs::remove_file(backup_file) {
        Ok(()) => debug!(backup = %backup_file.display(), "removed backup"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(backup = %backup_file.display(), error = %e, "failed to remove backup"),
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> (tempfile::TempDir, StateLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StateLayout::new(dir.path().join("state"));
        layout.ensure().unwrap();
        (dir, layout)
    }

    #[test]
    fn missing_entry_has_no_backup() {
        let (dir, layout) = layout();
        let entry = dir.path().join("index.jsx");
        let backup = SessionBackup::capture(&entry, backup_path(&layout), dir.path()).unwrap();
        assert!(backup.is_none());
    }

    #[test]
    fn restore_writes_original_content() {
        let (dir, layout) = layout();
        let entry = dir.path().join("index.jsx");
        fs::write(&entry, "original").unwrap();

        let backup = SessionBackup::capture(&entry, backup_path(&layout), dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(fs::read_to_string(&backup.backup_file_path).unwrap(), "original");

        fs::write(&entry, "generated").unwrap();
        assert_eq!(backup.restore().unwrap(), RestoreMethod::Written);
        assert_eq!(fs::read_to_string(&entry).unwrap(), "original");

        backup.discard();
        assert!(!backup.backup_file_path.exists());
    }

    #[test]
    fn restore_falls_back_to_copy() {
        let (dir, layout) = layout();
        let entry = dir.path().join("index.jsx");
        let backup = backup_path(&layout);
        fs::write(&backup, "from backup").unwrap();

        assert_eq!(restore_file(&entry, None, &backup, None).unwrap(), RestoreMethod::Copied);
        assert_eq!(fs::read_to_string(&entry).unwrap(), "from backup");
    }

    #[test]
    fn failed_restore_keeps_backup() {
        let (dir, layout) = layout();
        let backup = backup_path(&layout);
        fs::write(&backup, "keep me").unwrap();
        // Parent directory of the entry file does not exist
        let entry = dir.path().join("gone/index.jsx");

        assert!(restore_file(&entry, Some(b"keep me"), &backup, None).is_err());
        assert!(backup.exists());
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_reapplied() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, layout) = layout();
        let entry = dir.path().join("index.jsx");
        fs::write(&entry, "x").unwrap();
        fs::set_permissions(&entry, fs::Permissions::from_mode(0o640)).unwrap();

        let backup = SessionBackup::capture(&entry, backup_path(&layout), dir.path())
            .unwrap()
            .unwrap();
        fs::set_permissions(&entry, fs::Permissions::from_mode(0o600)).unwrap();
        backup.restore().unwrap();

        let mode = fs::metadata(&entry).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
