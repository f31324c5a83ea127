//! Preview Sessions
//!
//! Turns a target argument into a configuration file ([`Locator`]) and runs
//! one preview against it ([`PreviewSession`]): the app entry file is swapped
//! for a generated one that mounts only the previewed component, kept in sync
//! with the configuration while the dev server runs, and put back on every
//! exit path.
//!
//! ```no_run
//! use preview_session::{PreviewSession, Settings};
//! use std::path::Path;
//!
//! # async fn demo() -> Result<(), preview_session::PreviewError> {
//! let settings = Settings::default().with_env();
//! let session = PreviewSession::new(settings, Path::new("src/components/preview.yaml"))?;
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod locator;
pub mod session;
pub mod settings;
pub mod signal;

pub use error::{LocateError, PreviewError, PreviewErrorKind, SessionError};
pub use locator::{is_affirmative, scaffold_template, Confirm, Locator, StdinConfirm};
pub use session::{PreviewSession, SessionState};
pub use settings::{DevCommand, Settings, ENV_COMMAND, ENV_HOME};
pub use signal::{shutdown_signal, ShutdownSignals, Signal};
