//! Errors for the preview state directory

use preview_codegen::ResolveError;
use preview_value::ConfigError;
use std::path::PathBuf;

/// State directory, registry and session bookkeeping errors
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// Filesystem operation failed
    #[error("failed to {op} {path}: {source}")]
    Io {
        /// Operation that failed
        op: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// `init` found an existing state directory
    #[error("preview environment already exists: {0}")]
    AlreadyInitialized(PathBuf),

    /// A registration or marker does not exist
    #[error("no {what} named '{name}'")]
    NotFound {
        /// What was looked up
        what: &'static str,
        /// The missing name
        name: String,
    },

    /// A session is already running against the entry file
    #[error("a preview session is already running for {entry_file} (marker {marker})")]
    Conflict {
        /// Entry file the session owns
        entry_file: PathBuf,
        /// Marker file that records it
        marker: PathBuf,
    },

    /// Marker file is not valid JSON
    #[error("corrupt session marker {path}: {source}")]
    Marker {
        /// Marker file
        path: PathBuf,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration (for example an unusable registry id)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl EnvError {
    /// Create I/O error
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Create not found error
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    /// Create conflict error
    pub fn conflict(entry_file: impl Into<PathBuf>, marker: impl Into<PathBuf>) -> Self {
        Self::Conflict {
            entry_file: entry_file.into(),
            marker: marker.into(),
        }
    }

    /// Check if another session owns the entry file
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if something looked up does not exist
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Resolve(e) => e.is_not_found(),
            _ => false,
        }
    }
}
