//! Preview session lifecycle
//!
//! ```text
//! Idle ─▶ Installing ─▶ Active ─▶ Restoring ─▶ Idle
//!             │                       ▲
//!             ├───────────────────────┘   (failure after the entry file was touched)
//!             ▼
//!          Aborted                        (refused before anything was touched)
//! ```
//!
//! Installing renders the replacement, snapshots the original entry file,
//! records a running-instance marker and writes the generated entry file.
//! Active supervises the dev server while regenerating the entry file on
//! every configuration change. Restoring puts the original back (or removes
//! the generated file when there was none) and clears the marker, whatever
//! ended the session.

use crate::error::SessionError;
use crate::settings::{DevCommand, Settings};
use crate::signal::{shutdown_signal, Signal};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use preview_codegen::{generate, Language, PreviewConfig, ResolveError};
use preview_env::{backup_path, EnvError, MarkerStore, RunningInstanceMarker, SessionBackup};
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not started, or finished and restored
    Idle,
    /// Backing up and replacing the entry file
    Installing,
    /// Dev server running, configuration watched
    Active,
    /// Putting the original entry file back
    Restoring,
    /// Refused before anything was touched
    Aborted,
}

impl SessionState {
    /// Check if `next` may follow `self`
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{Aborted, Active, Idle, Installing, Restoring};
        matches!(
            (self, next),
            (Idle, Installing)
                | (Installing, Active | Restoring | Aborted)
                | (Active, Restoring)
                | (Restoring, Idle)
        )
    }
}

/// How the active phase ended
#[derive(Debug)]
enum Ending {
    Exited(ExitStatus),
    Signalled(Signal),
    Failed(SessionError),
}

/// One preview run against one entry file
#[derive(Debug)]
pub struct PreviewSession {
    settings: Settings,
    config_path: PathBuf,
    entry_file: PathBuf,
    language: Language,
    state: watch::Sender<SessionState>,
}

impl PreviewSession {
    /// Session for the configuration at `config_path`
    ///
    /// The configuration is read once here to decide the entry file and its
    /// language.
    ///
    /// # Errors
    /// `SessionError::Resolve` when the configuration cannot be loaded or the
    /// entry directory does not exist
    pub fn new(settings: Settings, config_path: &Path) -> Result<Self, SessionError> {
        let config_path = if config_path.is_absolute() {
            config_path.to_path_buf()
        } else {
            settings.working_dir().join(config_path)
        };
        let config = PreviewConfig::load(&config_path)?;
        let entry_file = settings.entry_file(&config);
        let language = settings.language(&config);

        if let Some(dir) = entry_file.parent() {
            if !dir.is_dir() {
                return Err(ResolveError::not_found("entry directory", dir).into());
            }
        }

        let (state, _) = watch::channel(SessionState::Idle);
        Ok(Self {
            settings,
            config_path,
            entry_file,
            language,
            state,
        })
    }

    /// Entry file this session replaces
    #[inline]
    #[must_use]
    pub fn entry_file(&self) -> &Path {
        &self.entry_file
    }

    /// Configuration file this session follows
    #[inline]
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Entry file language
    #[inline]
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow lifecycle transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run until the dev server exits or SIGINT/SIGTERM arrives
    ///
    /// # Errors
    /// See [`PreviewSession::run_until`]
    pub async fn run(self) -> Result<(), SessionError> {
        self.run_until(shutdown_signal).await
    }

    /// Run until the dev server exits or the future from `shutdown` resolves
    ///
    /// `shutdown` is called once the entry file has been backed up and the
    /// session marker taken, before the entry file is replaced. Listeners it
    /// registers are therefore armed for every step that needs restoring.
    ///
    /// # Errors
    /// - `SessionError::Env` with a conflict when another session holds the
    ///   entry file; nothing is touched
    /// - `SessionError::Resolve` when the configuration cannot be rendered;
    ///   nothing is touched
    /// - `SessionError::Io`, `Watch` or `Spawn` when installation fails after
    ///   the entry file was replaced; the original is restored first
    /// - `SessionError::ChildExit` when the dev server exits non-zero
    /// - `SessionError::Interrupted` when `shutdown` resolves first
    pub async fn run_until<F, Fut>(mut self, shutdown: F) -> Result<(), SessionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Signal>,
    {
        self.transition(SessionState::Installing)?;
        let layout = self.settings.layout();
        let store = MarkerStore::new(layout.clone());

        let content = match self.prepare(&store) {
            Ok(content) => content,
            Err(e) => {
                self.transition(SessionState::Aborted)?;
                return Err(e);
            }
        };

        let backup = match SessionBackup::capture(
            &self.entry_file,
            backup_path(&layout),
            self.settings.working_dir(),
        ) {
            Ok(backup) => backup,
            Err(e) => {
                self.transition(SessionState::Aborted)?;
                return Err(e.into());
            }
        };

        let mut marker =
            RunningInstanceMarker::new(&self.entry_file, self.settings.working_dir(), self.language);
        if let Some(backup) = &backup {
            marker = marker.with_backup(backup.backup_file_path.clone(), backup.original_file_mode);
        }
        let marker_path = match store.acquire(&marker) {
            Ok(path) => path,
            Err(e) => {
                if let Some(backup) = &backup {
                    backup.discard();
                }
                self.transition(SessionState::Aborted)?;
                return Err(e.into());
            }
        };
        info!(
            entry = %self.entry_file.display(),
            config = %self.config_path.display(),
            backup = backup.is_some(),
            "installing preview"
        );

        let shutdown = shutdown();
        let ending = self.supervise(&content, shutdown).await;

        self.transition(SessionState::Restoring)?;
        let restored = restore(&self.entry_file, backup.as_ref());
        if let Err(e) = store.release(&marker_path) {
            warn!(marker = %marker_path.display(), error = %e, "failed to remove session marker");
        }
        self.transition(SessionState::Idle)?;

        let outcome = match ending {
            Ending::Exited(status) if status.success() => Ok(()),
            Ending::Exited(status) => Err(SessionError::ChildExit {
                code: status.code(),
            }),
            Ending::Signalled(signal) => Err(SessionError::Interrupted(signal)),
            Ending::Failed(e) => Err(e),
        };
        match (outcome, restored) {
            (Err(e), _) => Err(e),
            (Ok(()), Err(e)) => Err(e.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Checks made before anything is touched
    fn prepare(&self, store: &MarkerStore) -> Result<String, SessionError> {
        store.guard(&self.entry_file)?;
        let content = generate(&self.config_path, &self.entry_file)?;
        debug!(bytes = content.len(), "rendered preview entry");
        Ok(content)
    }

    /// Write, watch, spawn, then wait for the session to end
    async fn supervise<Fut>(&mut self, content: &str, shutdown: Fut) -> Ending
    where
        Fut: Future<Output = Signal>,
    {
        if let Err(e) = fs::write(&self.entry_file, content) {
            return Ending::Failed(SessionError::io("write", &self.entry_file, e));
        }

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let watcher = match self.watch(events_tx) {
            Ok(watcher) => watcher,
            Err(e) => return Ending::Failed(e),
        };

        let command = self.settings.dev_command();
        let mut child = match spawn(&command, self.settings.working_dir()) {
            Ok(child) => child,
            Err(e) => return Ending::Failed(e),
        };

        if let Err(e) = self.transition(SessionState::Active) {
            return Ending::Failed(e);
        }
        info!(command = %command, "dev server started");

        let mut regenerator = Regenerator::new(
            &self.config_path,
            &self.entry_file,
            content,
            self.settings.watch_failure_threshold(),
        );
        tokio::pin!(shutdown);

        let ending = loop {
            tokio::select! {
                status = child.wait() => break match status {
                    Ok(status) => {
                        info!(code = ?status.code(), "dev server exited");
                        Ending::Exited(status)
                    }
                    Err(e) => Ending::Failed(SessionError::Spawn { command: command.to_string(), source: e }),
                },
                signal = &mut shutdown => {
                    info!(%signal, "stopping preview");
                    stop(&mut child).await;
                    break Ending::Signalled(signal);
                }
                Some(event) = events.recv() => match event {
                    Ok(event) if self.is_config_change(&event) => regenerator.regenerate(),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "configuration watcher error"),
                },
            }
        };

        drop(watcher);
        ending
    }

    fn watch(
        &self,
        events: mpsc::UnboundedSender<notify::Result<Event>>,
    ) -> Result<RecommendedWatcher, SessionError> {
        let dir = self
            .config_path
            .parent()
            .unwrap_or(self.settings.working_dir())
            .to_path_buf();
        let watch_error = |source| SessionError::Watch {
            path: dir.clone(),
            source,
        };

        let mut watcher = RecommendedWatcher::new(
            move |event: notify::Result<Event>| {
                let _ = events.send(event);
            },
            notify::Config::default(),
        )
        .map_err(watch_error)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        debug!(dir = %dir.display(), "watching configuration");
        Ok(watcher)
    }

    fn is_config_change(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        let name = self.config_path.file_name();
        event.paths.iter().any(|path| path.file_name() == name)
    }

    fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        debug!(from = ?current, to = ?next, "session transition");
        self.state.send_replace(next);
        Ok(())
    }
}

/// Rewrites the entry file after configuration changes
///
/// Failures keep the last good content in place. They are logged as
/// warnings, and as an error once `threshold` happen in a row.
struct Regenerator<'a> {
    config_path: &'a Path,
    entry_file: &'a Path,
    last: String,
    failures: u32,
    threshold: u32,
}

impl<'a> Regenerator<'a> {
    fn new(config_path: &'a Path, entry_file: &'a Path, installed: &str, threshold: u32) -> Self {
        Self {
            config_path,
            entry_file,
            last: installed.to_string(),
            failures: 0,
            threshold,
        }
    }

    fn regenerate(&mut self) {
        let written = generate(self.config_path, self.entry_file)
            .map_err(SessionError::from)
            .and_then(|content| {
                if content == self.last {
                    return Ok(false);
                }
                fs::write(self.entry_file, &content)
                    .map_err(|e| SessionError::io("write", self.entry_file, e))?;
                self.last = content;
                Ok(true)
            });

        match written {
            Ok(changed) => {
                if self.failures > 0 {
                    info!(after = self.failures, "preview regeneration recovered");
                }
                self.failures = 0;
                if changed {
                    info!(entry = %self.entry_file.display(), "regenerated preview entry");
                }
            }
            Err(e) => {
                self.failures += 1;
                if self.failures == self.threshold {
                    error!(
                        failures = self.failures,
                        error = %e,
                        "preview keeps failing to regenerate; showing last good version"
                    );
                } else {
                    warn!(failures = self.failures, error = %e, "failed to regenerate preview");
                }
            }
        }
    }
}

fn spawn(command: &DevCommand, working_dir: &Path) -> Result<Child, SessionError> {
    Command::new(command.program())
        .args(command.args())
        .current_dir(working_dir)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SessionError::Spawn {
            command: command.to_string(),
            source,
        })
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "dev server already gone");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap dev server");
    }
}

/// Put the entry file back the way it was
fn restore(entry_file: &Path, backup: Option<&SessionBackup>) -> Result<(), EnvError> {
    match backup {
        Some(backup) => {
            let method = backup.restore()?;
            backup.discard();
            info!(entry = %entry_file.display(), ?method, "restored original entry file");
            Ok(())
        }
        None => match fs::remove_file(entry_file) {
            Ok(()) => {
                info!(entry = %entry_file.display(), "removed generated entry file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!(entry = %entry_file.display(), error = %e, "failed to remove generated entry file");
                Err(EnvError::io("remove", entry_file, e))
            }
        },
    }
}
