//! Resolution errors

use preview_value::ConfigError;
use std::path::PathBuf;

/// Failure to turn a configuration file into a descriptor
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Malformed configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A referenced file does not exist
    #[error("{what} does not exist: {path}")]
    NotFound {
        /// What was looked up (`component file`, `configuration file`)
        what: &'static str,
        /// Path that was checked
        path: PathBuf,
    },

    /// Reading a file failed
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
}

impl ResolveError {
    /// Create not found error
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    /// Create I/O error
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this error reports a missing file
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
