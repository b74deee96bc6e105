//! Shutdown coordination.
//!
//! Two states, Running and Exiting. The first trigger (quit, a signal, end
//! of input, or a fault inside a unit) moves to Exiting and starts the
//! shutdown procedure; later triggers are ignored. The procedure:
//!
//! 1. raises the global exit flag seen by every offloaded unit
//! 2. cancels every outstanding cooperative task
//! 3. waits for them all to settle
//! 4. reports the loop as stopped
//!
//! The procedure runs as its own task, outside the set of tracked cooperative
//! tasks, so it never waits on itself.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::scheduler::CancelFlag;

/// What moved the coordinator to Exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Quit,
    Signal(&'static str),
    EndOfInput,
    /// A unit panicked or a worker process died unexpectedly.
    Fault(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Quit => write!(f, "quit"),
            ShutdownReason::Signal(name) => write!(f, "signal {name}"),
            ShutdownReason::EndOfInput => write!(f, "end of input"),
            ShutdownReason::Fault(message) => write!(f, "fault: {message}"),
        }
    }
}

struct Inner {
    exiting: AtomicBool,
    /// Parent of every cooperative task's token.
    tasks: CancellationToken,
    exit_flag: CancelFlag,
    tracker: TaskTracker,
    stopped: CancellationToken,
}

/// Cheaply cloneable handle to the process-wide shutdown state.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("exiting", &self.is_exiting())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                exiting: AtomicBool::new(false),
                tasks: CancellationToken::new(),
                exit_flag: CancelFlag::new(),
                tracker: TaskTracker::new(),
                stopped: CancellationToken::new(),
            }),
        }
    }

    pub fn is_exiting(&self) -> bool {
        self.inner.exiting.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.is_cancelled()
    }

    /// The global exit flag handed to every offloaded unit.
    pub fn exit_flag(&self) -> &CancelFlag {
        &self.inner.exit_flag
    }

    /// A fresh token for one cooperative task, cancelled by shutdown.
    pub(crate) fn task_token(&self) -> CancellationToken {
        self.inner.tasks.child_token()
    }

    /// Tracker the shutdown procedure drains.
    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.inner.tracker
    }

    /// Move to Exiting and start the shutdown procedure.
    ///
    /// Returns false, doing nothing, if shutdown was already triggered. Must be
    /// called from within the runtime.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.inner.exiting.swap(true, Ordering::AcqRel) {
            debug!(%reason, "shutdown already in progress");
            return false;
        }

        info!(%reason, "shutting down");
        let this = self.clone();
        tokio::spawn(async move { this.drain().await });
        true
    }

    async fn drain(self) {
        self.inner.exit_flag.raise();
        self.inner.tasks.cancel();

        self.inner.tracker.close();
        debug!(
            outstanding = self.inner.tracker.len(),
            "waiting for cooperative tasks"
        );
        self.inner.tracker.wait().await;

        debug!("loop stopped");
        self.inner.stopped.cancel();
    }

    /// Resolves once the shutdown procedure has finished.
    pub async fn stopped(&self) {
        self.inner.stopped.cancelled().await
    }
}

/// Route termination signals to the coordinator.
///
/// Installs listeners for SIGTERM, SIGHUP and SIGINT. Each listener keeps
/// running after the first delivery so repeated signals are absorbed.
#[cfg(unix)]
pub fn listen_for_signals(shutdown: &Shutdown) {
    use tokio::signal::unix::{SignalKind, signal};

    let kinds = [
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::hangup(), "SIGHUP"),
        (SignalKind::interrupt(), "SIGINT"),
    ];

    for (kind, name) in kinds {
        match signal(kind) {
            Ok(mut stream) => {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        shutdown.trigger(ShutdownReason::Signal(name));
                    }
                });
            }
            Err(e) => warn!(signal = name, error = %e, "cannot listen for signal"),
        }
    }
}

#[cfg(not(unix))]
pub fn listen_for_signals(shutdown: &Shutdown) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger(ShutdownReason::Signal("Ctrl-C"));
        }
    });
}
