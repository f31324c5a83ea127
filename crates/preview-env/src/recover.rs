//! Crash recovery
//!
//! A session that dies without running its restoration (killed with
//! SIGKILL, power loss) leaves its marker behind. [`recover`] replays the
//! restoration from what the marker recorded. It must only be run while no
//! session is active, since a live session's marker looks the same.

use crate::backup::{remove_backup, restore_file, RestoreMethod};
use crate::error::EnvError;
use crate::layout::StateLayout;
use crate::marker::MarkerStore;
use preview_codegen::GENERATED_BANNER;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// What recovery did for one marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Original entry file put back from the backup copy
    Restored(RestoreMethod),
    /// There was no original; the generated entry file was deleted
    RemovedGenerated,
    /// Entry file was never replaced, only the marker was cleared
    Untouched,
    /// Restoration failed; marker and backup are kept
    Failed(String),
}

/// Outcome for one stale session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    /// Entry file of the stale session
    pub entry_file: PathBuf,
    /// Marker that described it
    pub marker: PathBuf,
    /// What was done
    pub action: RecoveryAction,
}

/// Restore every entry file recorded by a leftover marker
///
/// # Errors
/// `EnvError::Io` when the temp directory cannot be listed
pub fn recover(layout: &StateLayout) -> Result<Vec<Recovered>, EnvError> {
    let store = MarkerStore::new(layout.clone());
    let mut outcomes = Vec::new();

    for (marker_path, marker) in store.list()? {
        let entry_file = marker.index_filename.clone();
        let action = match &marker.backup_file {
            Some(backup) if backup.is_file() => {
                match restore_file(&entry_file, None, backup, marker.file_mode) {
                    Ok(method) => {
                        remove_backup(backup);
                        RecoveryAction::Restored(method)
                    }
                    Err(e) => RecoveryAction::Failed(e.to_string()),
                }
            }
            // Backup is written before the entry file is touched
            Some(_) => RecoveryAction::Untouched,
            None if is_generated(&entry_file) => match fs::remove_file(&entry_file) {
                Ok(()) => RecoveryAction::RemovedGenerated,
                Err(e) => RecoveryAction::Failed(format!(
                    "failed to remove generated {}: {e}",
                    entry_file.display()
                )),
            },
            None => RecoveryAction::Untouched,
        };

        if matches!(action, RecoveryAction::Failed(_)) {
            warn!(entry = %entry_file.display(), marker = %marker_path.display(), "recovery failed");
        } else {
            store.release(&marker_path)?;
            info!(entry = %entry_file.display(), action = ?action, "recovered stale session");
        }
        outcomes.push(Recovered {
            entry_file,
            marker: marker_path,
            action,
        });
    }
    Ok(outcomes)
}

fn is_generated(entry_file: &std::path::Path) -> bool {
    fs::read_to_string(entry_file).is_ok_and(|content| content.starts_with(GENERATED_BANNER))
}
