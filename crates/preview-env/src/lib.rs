//! Preview Environment
//!
//! Everything a preview session persists outside the project sources:
//!
//! - [`StateLayout`]: the `storage/` and `temp/` directories
//! - [`Registry`]: id → configuration path records
//! - [`MarkerStore`]: running-instance markers guarding entry files
//! - [`SessionBackup`]: the original entry file, in memory and on disk
//! - [`recover`]: replays restoration for sessions that died uncleanly

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backup;
pub mod error;
pub mod layout;
pub mod marker;
pub mod recover;
pub mod registry;

pub use backup::{backup_path, RestoreMethod, SessionBackup};
pub use error::EnvError;
pub use layout::{StateLayout, DEFAULT_STATE_DIR};
pub use marker::{canonical_entry_path, marker_file_name, MarkerStore, RunningInstanceMarker};
pub use recover::{recover, Recovered, RecoveryAction};
pub use registry::{validate_id, Registry, RegistryEntry};
