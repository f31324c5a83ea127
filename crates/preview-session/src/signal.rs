//! Termination signals

use std::fmt;
use std::future::Future;
use tracing::warn;

/// Signal that ended a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT (Ctrl-C)
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl Signal {
    /// Shell convention: `128 + signo`
    #[inline]
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Signal::Interrupt => 130,
            Signal::Terminate => 143,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
        })
    }
}

/// SIGINT and SIGTERM listeners, registered on construction
///
/// A listener that cannot be registered never fires.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl ShutdownSignals {
    /// Register the listeners
    ///
    /// Must be called from within a Tokio runtime. From here on the
    /// process no longer dies on SIGINT/SIGTERM.
    #[must_use]
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let listen = |kind: SignalKind, name: &str| match signal(kind) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    warn!(error = %e, signal = name, "cannot listen for signal");
                    None
                }
            };
            Self {
                interrupt: listen(SignalKind::interrupt(), "SIGINT"),
                terminate: listen(SignalKind::terminate(), "SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        Self {}
    }

    /// Wait for the first signal
    #[cfg(unix)]
    pub async fn recv(mut self) -> Signal {
        tokio::select! {
            () = next(&mut self.interrupt) => Signal::Interrupt,
            () = next(&mut self.terminate) => Signal::Terminate,
        }
    }

    /// Wait for the first signal
    #[cfg(not(unix))]
    pub async fn recv(self) -> Signal {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        Signal::Interrupt
    }
}

#[cfg(unix)]
async fn next(listener: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(listener) = listener {
        if listener.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

/// Listen for SIGINT or SIGTERM
///
/// The listeners are registered by this call, not on the first poll of the
/// returned future.
pub fn shutdown_signal() -> impl Future<Output = Signal> {
    ShutdownSignals::install().recv()
}
