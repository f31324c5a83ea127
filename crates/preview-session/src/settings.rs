//! Session settings
//!
//! Defaults are applied once, at the command-line boundary, and then passed
//! explicitly. Precedence, lowest first: built-in defaults, environment
//! (`REACT_PREVIEW_HOME`, `REACT_PREVIEW_COMMAND`), command-line flags.

use preview_codegen::{Language, PreviewConfig};
use preview_env::{StateLayout, DEFAULT_STATE_DIR};
use std::fmt;
use std::path::{Path, PathBuf};

/// Overrides the state directory
pub const ENV_HOME: &str = "REACT_PREVIEW_HOME";
/// Overrides the dev-server command line
pub const ENV_COMMAND: &str = "REACT_PREVIEW_COMMAND";

/// Directory holding the entry file, relative to the working directory
pub const DEFAULT_ENTRY_DIR: &str = "src";
/// Consecutive failed regenerations before the failure is escalated
pub const DEFAULT_WATCH_FAILURE_THRESHOLD: u32 = 5;

const TSCONFIG: &str = "tsconfig.json";
const YARN_LOCK: &str = "yarn.lock";

/// Program and arguments of the dev server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevCommand {
    program: String,
    args: Vec<String>,
}

impl DevCommand {
    /// Command from program and arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace; `None` when it is blank
    ///
    /// No shell quoting is understood.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words))
    }

    /// `yarn run start` next to a `yarn.lock`, `npm run start` otherwise
    #[must_use]
    pub fn detect(working_dir: &Path) -> Self {
        let program = if working_dir.join(YARN_LOCK).is_file() {
            "yarn"
        } else {
            "npm"
        };
        Self::new(program, ["run", "start"])
    }

    /// Program name
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for DevCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Everything a session needs besides the configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    working_dir: PathBuf,
    state_dir: PathBuf,
    entry_dir: PathBuf,
    command: Option<DevCommand>,
    watch_failure_threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(working_dir)
    }
}

impl Settings {
    /// Defaults rooted at `working_dir`
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self {
            state_dir: working_dir.join(DEFAULT_STATE_DIR),
            entry_dir: working_dir.join(DEFAULT_ENTRY_DIR),
            working_dir,
            command: None,
            watch_failure_threshold: DEFAULT_WATCH_FAILURE_THRESHOLD,
        }
    }

    /// Apply `REACT_PREVIEW_HOME` and `REACT_PREVIEW_COMMAND` from the
    /// process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from `lookup`
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(home) = lookup(ENV_HOME).filter(|v| !v.trim().is_empty()) {
            self = self.with_state_dir(home);
        }
        if let Some(command) = lookup(ENV_COMMAND).as_deref().and_then(DevCommand::parse) {
            self.command = Some(command);
        }
        self
    }

    /// State directory; relative paths are taken from the working directory
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.state_dir = self.working_dir.join(dir);
        self
    }

    /// Entry directory; relative paths are taken from the working directory
    #[must_use]
    pub fn with_entry_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.entry_dir = self.working_dir.join(dir);
        self
    }

    /// Dev-server command, replacing detection
    #[must_use]
    pub fn with_command(mut self, command: DevCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Consecutive regeneration failures before they are logged as errors
    #[must_use]
    pub fn with_watch_failure_threshold(mut self, threshold: u32) -> Self {
        self.watch_failure_threshold = threshold.max(1);
        self
    }

    /// Working directory of the session and the dev server
    #[inline]
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// State directory
    #[inline]
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Directory holding the entry file
    #[inline]
    #[must_use]
    pub fn entry_dir(&self) -> &Path {
        &self.entry_dir
    }

    /// Regeneration failure threshold
    #[inline]
    #[must_use]
    pub fn watch_failure_threshold(&self) -> u32 {
        self.watch_failure_threshold
    }

    /// State directory layout
    #[must_use]
    pub fn layout(&self) -> StateLayout {
        StateLayout::new(&self.state_dir)
    }

    /// Explicit command, else the detected one
    #[must_use]
    pub fn dev_command(&self) -> DevCommand {
        self.command
            .clone()
            .unwrap_or_else(|| DevCommand::detect(&self.working_dir))
    }

    /// Entry file language
    ///
    /// The configured `language`, else TypeScript when a `tsconfig.json` sits
    /// in the entry directory or its parent.
    #[must_use]
    pub fn language(&self, config: &PreviewConfig) -> Language {
        if let Some(language) = config.language {
            return language;
        }
        let has_tsconfig = self.entry_dir.join(TSCONFIG).is_file()
            || self
                .entry_dir
                .parent()
                .is_some_and(|parent| parent.join(TSCONFIG).is_file());
        if has_tsconfig {
            Language::Ts
        } else {
            Language::Js
        }
    }

    /// Entry file the session replaces
    ///
    /// The configured `output` (relative to the working directory), else
    /// `index.tsx`/`index.jsx` in the entry directory.
    #[must_use]
    pub fn entry_file(&self, config: &PreviewConfig) -> PathBuf {
        match &config.output {
            Some(output) => self.working_dir.join(output),
            None => self
                .entry_dir
                .join(self.language(config).entry_file_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(yaml: &str) -> PreviewConfig {
        PreviewConfig::from_yaml_str(yaml, Path::new("preview.yaml")).unwrap()
    }

    #[test]
    fn defaults_are_relative_to_working_dir() {
        let settings = Settings::new("/work");
        assert_eq!(settings.state_dir(), Path::new("/work/preview"));
        assert_eq!(settings.entry_dir(), Path::new("/work/src"));
        assert_eq!(settings.watch_failure_threshold(), DEFAULT_WATCH_FAILURE_THRESHOLD);
    }

    #[test]
    fn environment_then_flags() {
        let env: HashMap<&str, &str> =
            [(ENV_HOME, "/elsewhere"), (ENV_COMMAND, "pnpm dev --port 3001")].into();
        let settings = Settings::new("/work").with_overrides(|k| env.get(k).map(ToString::to_string));
        assert_eq!(settings.state_dir(), Path::new("/elsewhere"));
        assert_eq!(settings.dev_command(), DevCommand::new("pnpm", ["dev", "--port", "3001"]));

        let settings = settings.with_state_dir("state");
        assert_eq!(settings.state_dir(), Path::new("/work/state"));
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let settings = Settings::new("/work").with_overrides(|_| Some("  ".to_string()));
        assert_eq!(settings.state_dir(), Path::new("/work/preview"));
        assert!(DevCommand::parse("   ").is_none());
    }

    #[test]
    fn dev_command_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(DevCommand::detect(dir.path()).to_string(), "npm run start");
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(DevCommand::detect(dir.path()).to_string(), "yarn run start");
    }

    #[test]
    fn entry_file_selection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let settings = Settings::new(dir.path());

        let plain = config("source: A.tsx\n");
        assert_eq!(settings.entry_file(&plain), dir.path().join("src/index.jsx"));

        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        assert_eq!(settings.entry_file(&plain), dir.path().join("src/index.tsx"));

        let explicit = config("source: A.tsx\nlanguage: js\n");
        assert_eq!(settings.entry_file(&explicit), dir.path().join("src/index.jsx"));

        let output = config("source: A.tsx\noutput: app/main.jsx\n");
        assert_eq!(settings.entry_file(&output), dir.path().join("app/main.jsx"));
    }

    #[test]
    fn threshold_is_at_least_one() {
        assert_eq!(Settings::new("/w").with_watch_failure_threshold(0).watch_failure_threshold(), 1);
    }
}
