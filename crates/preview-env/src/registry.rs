//! Id → configuration path registry
//!
//! One file per id under `storage/`; the file name is the id and the content
//! the canonical absolute path of the configuration file. Registering an id
//! again overwrites the previous record.

use crate::error::EnvError;
use crate::layout::StateLayout;
use preview_codegen::PreviewConfig;
use preview_value::ConfigError;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A registered configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Registry id
    pub id: String,
    /// Canonical absolute path of the configuration file
    pub path: PathBuf,
}

/// Registry stored in a state directory
#[derive(Debug, Clone)]
pub struct Registry {
    layout: StateLayout,
}

impl Registry {
    /// Registry inside `layout`
    #[inline]
    #[must_use]
    pub fn new(layout: StateLayout) -> Self {
        Self { layout }
    }

    /// Register a configuration file under its id
    ///
    /// The id is the configuration's `id` field, else the file name without
    /// extension.
    ///
    /// # Errors
    /// - `EnvError::Resolve` when the configuration cannot be loaded
    /// - `EnvError::Config` when the id is not a plain file name
    /// - `EnvError::Io` when the record cannot be written
    pub fn register(&self, config_path: &Path) -> Result<RegistryEntry, EnvError> {
        let config = PreviewConfig::load(config_path)?;
        let id = config.registry_id(config_path).unwrap_or_default();
        validate_id(&id)?;

        let path = fs::canonicalize(config_path)
            .map_err(|e| EnvError::io("resolve", config_path, e))?;
        self.layout.ensure()?;

        let record = self.record_path(&id);
        fs::write(&record, path.to_string_lossy().as_bytes())
            .map_err(|e| EnvError::io("write", &record, e))?;
        info!(id = %id, path = %path.display(), "registered preview");
        Ok(RegistryEntry { id, path })
    }

    /// Remove a registration
    ///
    /// # Errors
    /// `EnvError::NotFound` when nothing is registered under `id`
    pub fn unregister(&self, id: &str) -> Result<(), EnvError> {
        if validate_id(id).is_err() {
            return Err(EnvError::not_found("registration", id));
        }
        let record = self.record_path(id);
        match fs::remove_file(&record) {
            Ok(()) => {
                info!(id = %id, "unregistered preview");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(EnvError::not_found("registration", id)),
            Err(e) => Err(EnvError::io("remove", &record, e)),
        }
    }

    /// Configuration path registered under `id`
    ///
    /// # Errors
    /// `EnvError::Io` when the record exists but cannot be read
    pub fn lookup(&self, id: &str) -> Result<Option<PathBuf>, EnvError> {
        if validate_id(id).is_err() {
            return Ok(None);
        }
        let record = self.record_path(id);
        match fs::read_to_string(&record) {
            Ok(content) => {
                let path = PathBuf::from(content.trim_end_matches(['\n', '\r']));
                debug!(id = %id, path = %path.display(), "registry hit");
                Ok(Some(path))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EnvError::io("read", &record, e)),
        }
    }

    /// All registrations, sorted by id
    ///
    /// # Errors
    /// `EnvError::Io` when the storage directory cannot be listed
    pub fn entries(&self) -> Result<Vec<RegistryEntry>, EnvError> {
        let storage = self.layout.storage_dir();
        let dir = match fs::read_dir(&storage) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EnvError::io("list", &storage, e)),
        };

        let mut entries = Vec::new();
        for item in dir {
            let item = item.map_err(|e| EnvError::io("list", &storage, e))?;
            if !item.path().is_file() {
                continue;
            }
            let id = item.file_name().to_string_lossy().into_owned();
            if let Some(path) = self.lookup(&id)? {
                entries.push(RegistryEntry { id, path });
            }
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.layout.storage_dir().join(id)
    }
}

/// Ids are used as file names: non-empty, no separators, not `.` or `..`
///
/// # Errors
/// `ConfigError::InvalidField` for the `id` field
pub fn validate_id(id: &str) -> Result<(), ConfigError> {
    let problem = if id.is_empty() {
        Some("must not be empty")
    } else if id == "." || id == ".." {
        Some("must not be '.' or '..'")
    } else if id.contains(['/', '\\']) || id.contains('\0') {
        Some("must not contain path separators")
    } else {
        None
    };
    match problem {
        Some(message) => Err(ConfigError::invalid_field("id", format!("'{id}' {message}"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validation() {
        assert!(validate_id("card").is_ok());
        assert!(validate_id("card.v2").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("..").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a\\b").is_err());
    }

    #[test]
    fn lookup_of_unknown_or_invalid_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(StateLayout::new(dir.path()));
        assert_eq!(registry.lookup("missing").unwrap(), None);
        assert_eq!(registry.lookup("../etc").unwrap(), None);
        assert!(registry.entries().unwrap().is_empty());
    }
}
