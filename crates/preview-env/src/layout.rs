//! State directory layout
//!
//! ```text
//! <state-dir>/
//!   storage/<id>            registered configuration paths
//!   temp/session_<hash>.json running-instance markers
//!   temp/backup_<uuid>      original entry file contents
//! ```

use crate::error::EnvError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default state directory, relative to the working directory
pub const DEFAULT_STATE_DIR: &str = "preview";

const STORAGE_DIR: &str = "storage";
const TEMP_DIR: &str = "temp";

/// Paths inside the state directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    /// Layout rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// State directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry records
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.root.join(STORAGE_DIR)
    }

    /// Markers and backups
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Whether all directories exist
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.root.is_dir() && self.storage_dir().is_dir() && self.temp_dir().is_dir()
    }

    /// Create the layout from scratch
    ///
    /// # Errors
    /// `EnvError::AlreadyInitialized` when the state directory exists,
    /// `EnvError::Io` when a directory cannot be created
    pub fn init(&self) -> Result<(), EnvError> {
        if self.root.exists() {
            return Err(EnvError::AlreadyInitialized(self.root.clone()));
        }
        fs::create_dir_all(&self.root).map_err(|e| EnvError::io("create", &self.root, e))?;
        for dir in [self.storage_dir(), self.temp_dir()] {
            fs::create_dir(&dir).map_err(|e| EnvError::io("create", &dir, e))?;
        }
        info!(root = %self.root.display(), "initialized preview environment");
        Ok(())
    }

    /// Create whatever directories are missing
    ///
    /// # Errors
    /// `EnvError::Io` when a directory cannot be created
    pub fn ensure(&self) -> Result<(), EnvError> {
        for dir in [self.storage_dir(), self.temp_dir()] {
            fs::create_dir_all(&dir).map_err(|e| EnvError::io("create", &dir, e))?;
        }
        Ok(())
    }
}

impl Default for StateLayout {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_DIR)
    }
}
