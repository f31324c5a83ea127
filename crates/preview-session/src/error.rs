//! Error types for locating targets and running sessions
//!
//! [`PreviewError`] is what the binary sees. It folds every lower-level
//! error into one type and classifies it for exit-code mapping.

use crate::session::SessionState;
use crate::signal::Signal;
use preview_codegen::ResolveError;
use preview_env::EnvError;
use preview_value::ConfigError;
use std::path::PathBuf;

/// Target argument could not be turned into a configuration file
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// Not a path and not a registered id
    #[error("cannot find a directory, file or registered id named '{target}'")]
    NotFound {
        /// The argument as given
        target: String,
    },

    /// A directory or file was found but no configuration sits next to it
    #[error("no preview configuration at {path}")]
    MissingConfig {
        /// Where the configuration was expected
        path: PathBuf,
    },

    /// User declined to scaffold a configuration
    #[error("no preview configuration at {path}; scaffolding declined")]
    Aborted {
        /// Where the configuration would have been written
        path: PathBuf,
    },

    /// Prompt or scaffold I/O failed
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

    /// Registry lookup failed
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl LocateError {
    /// Create I/O error
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Session lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Configuration could not be resolved or rendered
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Marker, backup or restoration failure, or a conflicting session
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Writing the generated entry file failed
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

    /// Configuration watcher could not be started
    #[error("failed to watch {path}: {source}")]
    Watch {
        /// Watched directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: notify::Error,
    },

    /// Dev server could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Dev server exited unsuccessfully
    #[error("dev server exited with {}", describe_code(.code))]
    ChildExit {
        /// Exit code, `None` when the child was killed by a signal
        code: Option<i32>,
    },

    /// Session was interrupted by a signal
    #[error("interrupted by {0}")]
    Interrupted(Signal),

    /// Lifecycle step attempted out of order
    #[error("invalid session transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Requested state
        to: SessionState,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("code {code}"),
        None => "no exit code".to_string(),
    }
}

impl SessionError {
    /// Create I/O error
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Check if another session owns the entry file
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Env(e) if e.is_conflict())
    }
}

/// Broad category of a [`PreviewError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewErrorKind {
    /// Malformed configuration or arguments
    Config,
    /// Missing file, directory or registration
    NotFound,
    /// Another session holds the entry file
    Conflict,
    /// Filesystem failure
    Io,
    /// Dev server failed to start or exited unsuccessfully
    ChildProcess,
    /// User declined a prompt
    Aborted,
    /// SIGINT or SIGTERM
    Interrupted,
}

/// Any failure surfaced to the command line
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Target location failed
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Session failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// State directory or registry failed
    #[error(transparent)]
    Env(#[from] EnvError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PreviewError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> PreviewErrorKind {
        match self {
            Self::Locate(e) => match e {
                LocateError::NotFound { .. } | LocateError::MissingConfig { .. } => {
                    PreviewErrorKind::NotFound
                }
                LocateError::Aborted { .. } => PreviewErrorKind::Aborted,
                LocateError::Io { .. } => PreviewErrorKind::Io,
                LocateError::Env(e) => env_kind(e),
            },
            Self::Session(e) => match e {
                SessionError::Resolve(e) => resolve_kind(e),
                SessionError::Env(e) => env_kind(e),
                SessionError::Io { .. } | SessionError::Watch { .. } => PreviewErrorKind::Io,
                SessionError::Spawn { .. } | SessionError::ChildExit { .. } => {
                    PreviewErrorKind::ChildProcess
                }
                SessionError::Interrupted(_) => PreviewErrorKind::Interrupted,
                SessionError::InvalidTransition { .. } => PreviewErrorKind::Config,
            },
            Self::Env(e) => env_kind(e),
            Self::Resolve(e) => resolve_kind(e),
            Self::Config(_) => PreviewErrorKind::Config,
        }
    }

    /// Process exit code for this error
    ///
    /// The dev server's own code is passed through; signals map to
    /// `128 + signo`; everything else is `1`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Session(SessionError::ChildExit { code: Some(code) }) => *code,
            Self::Session(SessionError::Interrupted(signal)) => signal.exit_code(),
            _ => 1,
        }
    }
}

fn env_kind(error: &EnvError) -> PreviewErrorKind {
    match error {
        EnvError::Conflict { .. } => PreviewErrorKind::Conflict,
        EnvError::NotFound { .. } => PreviewErrorKind::NotFound,
        EnvError::Config(_) | EnvError::Marker { .. } | EnvError::AlreadyInitialized(_) => {
            PreviewErrorKind::Config
        }
        EnvError::Io { .. } => PreviewErrorKind::Io,
        EnvError::Resolve(e) => resolve_kind(e),
    }
}

fn resolve_kind(error: &ResolveError) -> PreviewErrorKind {
    match error {
        ResolveError::Config(_) => PreviewErrorKind::Config,
        ResolveError::NotFound { .. } => PreviewErrorKind::NotFound,
        ResolveError::Io { .. } => PreviewErrorKind::Io,
    }
}
