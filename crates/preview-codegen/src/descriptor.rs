//! Descriptor resolution
//!
//! A [`PreviewDescriptor`] is everything the renderer needs: component
//! identifier, how and from where to import it, its props and the container
//! style. It is derived fresh from the configuration on every regeneration so
//! the module path always reflects the entry file's current location.

use crate::config::{ImportStyle, PreviewConfig};
use crate::error::ResolveError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use preview_value::{ConfigError, Value};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile"));

static EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[^.]*$").expect("extension regex must compile"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$:.-]*$").expect("attribute regex must compile")
});

/// Normalized description of the component to mount
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewDescriptor {
    /// Identifier the component is imported as
    pub component_name: String,
    /// Import form
    pub import_style: ImportStyle,
    /// Module path relative to the entry file, `./` or `../` prefixed
    pub source_module_path: String,
    /// Interpreted props, in configuration order
    pub props: IndexMap<String, Value>,
    /// Container style: `height`, `width`, then extra entries
    pub style: IndexMap<String, Value>,
}

/// Resolve a configuration against its file location and the entry file
///
/// # Errors
/// - `ResolveError::NotFound` when the component file does not exist
/// - `ResolveError::Config` for invalid names, style or props
pub fn resolve(
    config: &PreviewConfig,
    config_path: &Path,
    entry_file: &Path,
) -> Result<PreviewDescriptor, ResolveError> {
    let config_path = absolute(config_path)?;
    let entry_file = absolute(entry_file)?;
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("/"));

    let component_file = normalize(&config_dir.join(&config.source));
    if !component_file.is_file() {
        return Err(ResolveError::not_found("component file", component_file));
    }

    let component_name = match &config.component_name {
        Some(name) => name.clone(),
        None => derive_component_name(&component_file)?,
    };

    let entry_dir = entry_file.parent().unwrap_or_else(|| Path::new("/"));
    let source_module_path = module_path(entry_dir, &component_file);

    let props = config.interpreter().interpret_props(config.props.as_ref())?;
    if let Some(name) = props.keys().find(|name| !ATTRIBUTE.is_match(name)) {
        return Err(ConfigError::invalid_field(
            "props",
            format!("'{name}' is not a valid attribute name"),
        )
        .into());
    }

    let style = container_style(config);
    debug!(
        component = %component_name,
        module = %source_module_path,
        props = props.len(),
        "resolved preview descriptor"
    );

    Ok(PreviewDescriptor {
        component_name,
        import_style: config.import_style(),
        source_module_path,
        props,
        style,
    })
}

/// Whether `name` is a plain identifier
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Derive a component identifier from a file name
///
/// Trailing extension-like suffixes are stripped until the remainder is an
/// identifier: `Widget.preview.tsx` → `Widget`.
///
/// # Errors
/// `ConfigError::InvalidIdentifier` when no prefix qualifies
pub fn derive_component_name(file: &Path) -> Result<String, ConfigError> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut candidate = file_name.as_str();
    loop {
        if IDENTIFIER.is_match(candidate) {
            return Ok(candidate.to_string());
        }
        match EXTENSION.find(candidate) {
            Some(ext) if ext.start() > 0 => candidate = &candidate[..ext.start()],
            _ => return Err(ConfigError::InvalidIdentifier(file_name)),
        }
    }
}

/// Module specifier for `target` as imported from a file in `from_dir`
///
/// The extension is stripped, separators are `/` and the result always starts
/// with `./` or `../`.
#[must_use]
pub fn module_path(from_dir: &Path, target: &Path) -> String {
    let relative = relative_path(&normalize(from_dir), &normalize(target));
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some(ext) = EXTENSION.find(last) {
            if ext.start() > 0 {
                last.truncate(ext.start());
            }
        }
    }

    let joined = parts.join("/");
    if joined.starts_with("../") {
        joined
    } else {
        format!("./{joined}")
    }
}

fn container_style(config: &PreviewConfig) -> IndexMap<String, Value> {
    let mut style = IndexMap::new();
    style.insert(
        "height".to_string(),
        config.height.clone().unwrap_or_default().to_value(),
    );
    style.insert(
        "width".to_string(),
        config.width.clone().unwrap_or_default().to_value(),
    );
    if let Some(Value::Object(extra)) = config.style.as_ref().map(Value::from_yaml_literal) {
        // Explicit entries win; `insert` keeps the original position
        style.extend(extra);
    }
    style
}

fn absolute(path: &Path) -> Result<PathBuf, ResolveError> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir()
        .map_err(|e| ResolveError::io("read working directory", path, e))?;
    Ok(normalize(&cwd.join(path)))
}

/// Lexically resolve `.` and `..`
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component.as_os_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn component_names() {
        assert_eq!(derive_component_name(Path::new("Widget.preview.tsx")).unwrap(), "Widget");
        assert_eq!(derive_component_name(Path::new("/a/b/Card.jsx")).unwrap(), "Card");
        assert_eq!(derive_component_name(Path::new("Button")).unwrap(), "Button");
        assert!(matches!(
            derive_component_name(Path::new("123.tsx")),
            Err(ConfigError::InvalidIdentifier(name)) if name == "123.tsx"
        ));
        assert!(derive_component_name(Path::new("my-card.tsx")).is_err());
        assert!(derive_component_name(Path::new(".tsx")).is_err());
    }

    #[test]
    fn module_paths() {
        assert_eq!(module_path(Path::new("/p/src"), Path::new("/p/src/Card.tsx")), "./Card");
        assert_eq!(
            module_path(Path::new("/p/src"), Path::new("/p/src/components/Card.tsx")),
            "./components/Card"
        );
        assert_eq!(
            module_path(Path::new("/p/src"), Path::new("/p/lib/ui/Card.tsx")),
            "../lib/ui/Card"
        );
        assert_eq!(
            module_path(Path::new("/p/src/./x/.."), Path::new("/p/src/Widget.preview.tsx")),
            "./Widget.preview"
        );
    }

    #[test]
    fn style_defaults_and_overrides() {
        let config = PreviewConfig::from_yaml_str(
            "source: a.tsx\nheight: 200\nstyle: {width: 10px, border: none}",
            Path::new("preview.yaml"),
        )
        .unwrap();
        let style = container_style(&config);
        let keys: Vec<_> = style.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["height", "width", "border"]);
        assert_eq!(style["height"], Value::Number(200.0));
        assert_eq!(style["width"], Value::from("10px"));
    }
}
