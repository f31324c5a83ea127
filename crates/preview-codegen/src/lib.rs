//! Preview Code Generation
//!
//! Loads `preview.yaml`, resolves it into a [`PreviewDescriptor`] and renders
//! the replacement entry file that mounts only the previewed component.
//!
//! ```text
//! preview.yaml → PreviewConfig → resolve() → PreviewDescriptor → render() → source text
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod render;

pub use config::{Dimension, ImportStyle, Language, PreviewConfig, CONFIG_FILE_NAME};
pub use descriptor::{derive_component_name, module_path, resolve, PreviewDescriptor};
pub use error::ResolveError;
pub use render::{render, GENERATED_BANNER};

use std::path::Path;

/// Load, resolve and render in one step
///
/// Used for both the initial installation and every regeneration after the
/// configuration file changes.
///
/// # Errors
/// Any [`ResolveError`] from loading or resolution
pub fn generate(config_path: &Path, entry_file: &Path) -> Result<String, ResolveError> {
    let config = PreviewConfig::load(config_path)?;
    let descriptor = resolve(&config, config_path, entry_file)?;
    Ok(render(&descriptor))
}
