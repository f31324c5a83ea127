//! Running-instance markers
//!
//! A session records itself in `temp/session_<sha256>.json`, where the digest
//! is taken over the canonical entry path. The marker is created with
//! exclusive-create semantics so two sessions against the same entry file
//! cannot both succeed. Markers written under other names (older versions,
//! other state directories copied in) are found by scanning for a matching
//! `indexFilename`.

use crate::error::EnvError;
use crate::layout::StateLayout;
use chrono::{DateTime, Utc};
use preview_codegen::Language;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const MARKER_PREFIX: &str = "session_";
const MARKER_SUFFIX: &str = ".json";

/// Persisted record of a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningInstanceMarker {
    /// Canonical entry file the session replaced
    pub index_filename: PathBuf,
    /// Working directory of the session
    pub working_directory: PathBuf,
    /// Entry file language
    pub language: Language,
    /// Session start
    pub created_at: DateTime<Utc>,
    /// Copy of the original entry file, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<PathBuf>,
    /// Unix permission bits of the original entry file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mode: Option<u32>,
}

impl RunningInstanceMarker {
    /// Marker for `entry_file`, stamped now
    #[must_use]
    pub fn new(entry_file: &Path, working_directory: &Path, language: Language) -> Self {
        Self {
            index_filename: canonical_entry_path(entry_file),
            working_directory: working_directory.to_path_buf(),
            language,
            created_at: Utc::now(),
            backup_file: None,
            file_mode: None,
        }
    }

    /// With backup location and original mode
    #[must_use]
    pub fn with_backup(mut self, backup_file: PathBuf, file_mode: Option<u32>) -> Self {
        self.backup_file = Some(backup_file);
        self.file_mode = file_mode;
        self
    }
}

/// Canonical form of an entry path that may not exist yet
///
/// The parent directory is canonicalized when it exists; otherwise the path
/// is made absolute and normalized lexically.
#[must_use]
pub fn canonical_entry_path(entry_file: &Path) -> PathBuf {
    if let Ok(path) = fs::canonicalize(entry_file) {
        return path;
    }
    let absolute = if entry_file.is_absolute() {
        entry_file.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(entry_file))
            .unwrap_or_else(|_| entry_file.to_path_buf())
    };
    let normalized = normalize(&absolute);
    let Some(name) = normalized.file_name().map(ToOwned::to_owned) else {
        return normalized;
    };
    match normalized.parent().map(fs::canonicalize) {
        Some(Ok(parent)) => parent.join(name),
        _ => normalized,
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Marker file name for an entry file
#[must_use]
pub fn marker_file_name(entry_file: &Path) -> String {
    let canonical = canonical_entry_path(entry_file);
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    format!("{MARKER_PREFIX}{}{MARKER_SUFFIX}", hex::encode(digest))
}

/// Markers in a state directory
#[derive(Debug, Clone)]
pub struct MarkerStore {
    layout: StateLayout,
}

impl MarkerStore {
    /// Store inside `layout`
    #[inline]
    #[must_use]
    pub fn new(layout: StateLayout) -> Self {
        Self { layout }
    }

    /// Path the marker for `entry_file` is created at
    #[must_use]
    pub fn marker_path(&self, entry_file: &Path) -> PathBuf {
        self.layout.temp_dir().join(marker_file_name(entry_file))
    }

    /// Refuse when a session is already recorded for `entry_file`
    ///
    /// # Errors
    /// `EnvError::Conflict` naming the marker that was found
    pub fn guard(&self, entry_file: &Path) -> Result<(), EnvError> {
        match self.find(entry_file)? {
            Some((marker_path, marker)) => {
                Err(EnvError::conflict(marker.index_filename, marker_path))
            }
            None => Ok(()),
        }
    }

    /// Exclusively create the marker
    ///
    /// # Errors
    /// - `EnvError::Conflict` when another session holds the entry file
    /// - `EnvError::Io` when the marker cannot be written
    pub fn acquire(&self, marker: &RunningInstanceMarker) -> Result<PathBuf, EnvError> {
        self.guard(&marker.index_filename)?;
        self.layout.ensure()?;

        let path = self.marker_path(&marker.index_filename);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(EnvError::conflict(&marker.index_filename, path));
            }
            Err(e) => return Err(EnvError::io("create", &path, e)),
        };

        let json = serde_json::to_vec_pretty(marker).map_err(|source| EnvError::Marker {
            path: path.clone(),
            source,
        })?;
        let written = file.write_all(&json).and_then(|()| file.sync_all());
        if let Err(e) = written {
            // Half-written markers would block every later session
            let _ = fs::remove_file(&path);
            return Err(EnvError::io("write", &path, e));
        }
        debug!(
            marker = %path.display(),
            entry = %marker.index_filename.display(),
            "acquired session marker"
        );
        Ok(path)
    }

    /// Remove a marker; a missing marker is not an error
    ///
    /// # Errors
    /// `EnvError::Io` when the file exists but cannot be removed
    pub fn release(&self, marker_path: &Path) -> Result<(), EnvError> {
        match fs::remove_file(marker_path) {
            Ok(()) => {
                debug!(marker = %marker_path.display(), "released session marker");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EnvError::io("remove", marker_path, e)),
        }
    }

    /// Marker recorded for `entry_file`, under any name
    ///
    /// # Errors
    /// `EnvError::Io` when the temp directory cannot be listed
    pub fn find(
        &self,
        entry_file: &Path,
    ) -> Result<Option<(PathBuf, RunningInstanceMarker)>, EnvError> {
        let canonical = canonical_entry_path(entry_file);
        Ok(self
            .list()?
            .into_iter()
            .find(|(_, marker)| canonical_entry_path(&marker.index_filename) == canonical))
    }

    /// Every readable marker; unreadable ones are logged and skipped
    ///
    /// # Errors
    /// `EnvError::Io` when the temp directory cannot be listed
    pub fn list(&self) -> Result<Vec<(PathBuf, RunningInstanceMarker)>, EnvError> {
        let temp = self.layout.temp_dir();
        let dir = match fs::read_dir(&temp) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EnvError::io("list", &temp, e)),
        };

        let mut markers = Vec::new();
        for item in dir {
            let item = item.map_err(|e| EnvError::io("list", &temp, e))?;
            let name = item.file_name().to_string_lossy().into_owned();
            if !name.starts_with(MARKER_PREFIX) || !name.ends_with(MARKER_SUFFIX) {
                continue;
            }
            let path = item.path();
            match read_marker(&path) {
                Ok(marker) => markers.push((path, marker)),
                Err(e) => warn!(error = %e, "skipping unreadable session marker"),
            }
        }
        markers.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(markers)
    }
}

/// Read one marker file
///
/// # Errors
/// `EnvError::Io` or `EnvError::Marker`
pub fn read_marker(path: &Path) -> Result<RunningInstanceMarker, EnvError> {
    let bytes = fs::read(path).map_err(|e| EnvError::io("read", path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| EnvError::Marker {
        path: path.to_path_buf(),
        source,
    })
}
