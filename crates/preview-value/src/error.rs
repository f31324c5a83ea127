//! Configuration errors
//!
//! Every malformed or unrecognized configuration value surfaces as a
//! [`ConfigError`]. These are always raised before any file is touched.

use crate::script::CompileError;
use std::path::PathBuf;

/// Malformed or unrecognized configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `kind` discriminator is not one of the supported kinds
    #[error("unrecognized value kind '{kind}'")]
    UnknownKind {
        /// The discriminator found in the configuration
        kind: String,
    },

    /// Payload of a tagged value has the wrong shape
    #[error("value of kind '{kind}' expects {expected} as its payload")]
    InvalidPayload {
        /// Kind of the tagged value
        kind: &'static str,
        /// Human readable description of the expected payload
        expected: &'static str,
    },

    /// Structured function spec violates its invariants
    #[error("invalid function spec: {0}")]
    InvalidFunctionSpec(String),

    /// Function source failed to compile
    #[error("failed to compile function `{source_text}`: {error}")]
    Compile {
        /// The offending source text
        source_text: String,
        /// Compiler diagnostic
        #[source]
        error: CompileError,
    },

    /// Top-level `props` did not interpret to a mapping
    #[error("props must be a mapping, found {found}")]
    PropsNotObject {
        /// `typeof`-style description of what was found
        found: &'static str,
    },

    /// Component name could not be derived from a file name
    #[error("cannot derive a valid identifier from '{0}'")]
    InvalidIdentifier(String),

    /// A configuration field has an invalid value
    #[error("invalid value for field '{field}': {message}")]
    InvalidField {
        /// Field name as written in the configuration file
        field: &'static str,
        /// Description of the problem
        message: String,
    },

    /// Configuration file is not valid YAML or does not match the schema
    #[error("failed to parse configuration {path}: {source}")]
    Yaml {
        /// Configuration file path
        path: PathBuf,
        /// Underlying parser error
        #[source]
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    /// Create invalid field error
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    /// Create YAML parse error for path
    pub fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.into(),
            source,
        }
    }

    /// Create compile error carrying the offending source
    pub fn compile(source_text: impl Into<String>, error: CompileError) -> Self {
        Self::Compile {
            source_text: source_text.into(),
            error,
        }
    }
}
