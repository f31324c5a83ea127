//! Target location
//!
//! A target argument is, in order of preference:
//!
//! 1. a directory holding `preview.yaml`
//! 2. a configuration file (`.yaml`/`.yml`)
//! 3. a component file with `preview.yaml` next to it
//! 4. a registered id
//!
//! When a component file has no configuration yet, the user is asked whether
//! to scaffold one.

use crate::error::LocateError;
use preview_codegen::CONFIG_FILE_NAME;
use preview_env::Registry;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml"];
const COMPONENT_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "mjs", "cjs"];
const AFFIRMATIVE: &[&str] = &["y", "yes", "ok", "yep", "yeah"];

/// Yes/no question to the user
pub trait Confirm {
    /// Ask `question`; `true` means go ahead
    ///
    /// # Errors
    /// Any I/O error from the underlying terminal
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(self(question))
    }
}

/// Asks on stderr, reads one line from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

/// `y`, `yes`, `ok`, `yep` or `yeah`, in any case
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE.contains(&answer.as_str())
}

/// Resolves target arguments to configuration files
pub struct Locator<'a> {
    working_dir: PathBuf,
    registry: &'a Registry,
    confirm: &'a mut dyn Confirm,
}

impl<'a> Locator<'a> {
    /// Locator resolving relative targets against `working_dir`
    pub fn new(
        working_dir: impl Into<PathBuf>,
        registry: &'a Registry,
        confirm: &'a mut dyn Confirm,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            registry,
            confirm,
        }
    }

    /// Configuration file for `target`
    ///
    /// # Errors
    /// - `LocateError::NotFound` when the target is neither a path nor a
    ///   registered id
    /// - `LocateError::MissingConfig` when a directory or non-component file
    ///   has no configuration next to it
    /// - `LocateError::Aborted` when scaffolding was declined
    pub fn locate(&mut self, target: &str) -> Result<PathBuf, LocateError> {
        let path = self.working_dir.join(target);

        if path.is_dir() {
            let config = path.join(CONFIG_FILE_NAME);
            if config.is_file() {
                debug!(config = %config.display(), "located configuration in directory");
                return Ok(config);
            }
            return Err(LocateError::MissingConfig { path: config });
        }

        if path.is_file() {
            if has_extension(&path, CONFIG_EXTENSIONS) {
                return Ok(path);
            }
            let config = path
                .parent()
                .unwrap_or(&self.working_dir)
                .join(CONFIG_FILE_NAME);
            if config.is_file() {
                debug!(config = %config.display(), "located configuration next to file");
                return Ok(config);
            }
            if !has_extension(&path, COMPONENT_EXTENSIONS) {
                return Err(LocateError::MissingConfig { path: config });
            }
            return self.scaffold(&path, config);
        }

        match self.registry.lookup(target)? {
            Some(config) => {
                debug!(id = %target, config = %config.display(), "located registered configuration");
                Ok(config)
            }
            None => Err(LocateError::NotFound {
                target: target.to_string(),
            }),
        }
    }

    fn scaffold(&mut self, component: &Path, config: PathBuf) -> Result<PathBuf, LocateError> {
        let question = format!(
            "Cannot find a preview file at {}. Do you want to create a template preview file?",
            config.display()
        );
        let accepted = self
            .confirm
            .confirm(&question)
            .map_err(|e| LocateError::io("prompt for", &config, e))?;
        if !accepted {
            return Err(LocateError::Aborted { path: config });
        }

        let source = component
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        fs::write(&config, scaffold_template(&source))
            .map_err(|e| LocateError::io("write", &config, e))?;
        info!(config = %config.display(), "created preview configuration");
        Ok(config)
    }
}

/// Configuration written for a component without one
#[must_use]
pub fn scaffold_template(source: &str) -> String {
    format!("source: {source}\nprops: {{}}\n")
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
