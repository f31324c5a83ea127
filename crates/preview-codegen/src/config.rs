//! `preview.yaml` configuration
//!
//! ```yaml
//! source: Card.tsx          # required, relative to this file
//! id: card                  # registry id, defaults to the file stem
//! componentName: Card       # defaults to a name derived from `source`
//! importStyle: default      # default | named | namespace | dynamicRequire
//! output: src/index.tsx     # entry file override, relative to the working dir
//! language: ts              # ts | js
//! height: 300               # number or string, defaults to "auto"
//! width: auto
//! style: {border: 1px solid}
//! props:
//!   label: {kind: string, value: Hi}
//! legacyNullProps: false
//! ```

use crate::error::ResolveError;
use preview_value::{ConfigError, Interpreter, NullPolicy, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name looked up in directories
pub const CONFIG_FILE_NAME: &str = "preview.yaml";

/// Default for `height` and `width`
pub const AUTO_DIMENSION: &str = "auto";

/// Parsed `preview.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Component file, relative to the configuration file
    pub source: String,
    /// Registry id
    #[serde(default)]
    pub id: Option<String>,
    /// Component identifier override
    #[serde(default)]
    pub component_name: Option<String>,
    /// Entry file override, relative to the working directory
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Source language of the generated entry file
    #[serde(default)]
    pub language: Option<Language>,
    /// Container height
    #[serde(default)]
    pub height: Option<Dimension>,
    /// Container width
    #[serde(default)]
    pub width: Option<Dimension>,
    /// Extra container style entries
    #[serde(default)]
    pub style: Option<serde_yaml::Value>,
    /// How the component is imported
    #[serde(default)]
    pub import_style: Option<ImportStyle>,
    /// Component props, as tagged configuration values
    #[serde(default)]
    pub props: Option<serde_yaml::Value>,
    /// Interpret nested `null` props as empty objects
    #[serde(default)]
    pub legacy_null_props: bool,
}

impl PreviewConfig {
    /// Parse configuration text; `path` is only used for diagnostics
    ///
    /// # Errors
    /// `ConfigError::Yaml` for malformed YAML or schema mismatches,
    /// `ConfigError::InvalidField` for semantically invalid fields
    pub fn from_yaml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::yaml(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    /// `ResolveError::NotFound` when the file is missing, otherwise as
    /// [`PreviewConfig::from_yaml_str`]
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResolveError::not_found("configuration file", path)
            } else {
                ResolveError::io("read", path, e)
            }
        })?;
        Ok(Self::from_yaml_str(&text, path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.trim().is_empty() {
            return Err(ConfigError::invalid_field("source", "must not be empty"));
        }
        if let Some(name) = &self.component_name {
            if !crate::descriptor::is_identifier(name) {
                return Err(ConfigError::InvalidIdentifier(name.clone()));
            }
        }
        if let Some(style) = &self.style {
            if !style.is_mapping() && !style.is_null() {
                return Err(ConfigError::invalid_field("style", "expected a mapping"));
            }
        }
        Ok(())
    }

    /// Import style, `default` when unset
    #[inline]
    #[must_use]
    pub fn import_style(&self) -> ImportStyle {
        self.import_style.unwrap_or_default()
    }

    /// Null policy selected by `legacyNullProps`
    #[inline]
    #[must_use]
    pub fn null_policy(&self) -> NullPolicy {
        if self.legacy_null_props {
            NullPolicy::EmptyObject
        } else {
            NullPolicy::Literal
        }
    }

    /// Interpreter configured for this file
    #[must_use]
    pub fn interpreter(&self) -> Interpreter {
        Interpreter::new().with_null_policy(self.null_policy())
    }

    /// Registry id: `id` when set, else the configuration file's stem
    #[must_use]
    pub fn registry_id(&self, config_path: &Path) -> Option<String> {
        self.id.clone().or_else(|| {
            config_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
    }
}

/// Source language of the entry file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// TypeScript, `index.tsx`
    Ts,
    /// JavaScript, `index.jsx`
    Js,
}

impl Language {
    /// Entry file name for this language
    #[inline]
    #[must_use]
    pub fn entry_file_name(self) -> &'static str {
        match self {
            Language::Ts => "index.tsx",
            Language::Js => "index.jsx",
        }
    }

    /// Name as written in configuration
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Ts => "ts",
            Language::Js => "js",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the component module is imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStyle {
    /// `import Name from '<path>'`
    #[default]
    Default,
    /// `import {Name} from '<path>'`
    #[serde(alias = "target")]
    Named,
    /// `import * as Name from '<path>'`
    Namespace,
    /// `const Name = require('<path>')`
    #[serde(alias = "require")]
    DynamicRequire,
}

/// Container dimension: CSS string or pixel number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Pixels
    Number(f64),
    /// Any CSS length, `auto`
    Text(String),
}

impl Default for Dimension {
    fn default() -> Self {
        Self::Text(AUTO_DIMENSION.to_string())
    }
}

impl Dimension {
    /// Runtime value used in the style object
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}
