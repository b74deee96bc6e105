//! Cancellation flags for offloaded units.
//!
//! A [`CancelFlag`] is a one-way boolean: once raised it stays raised. In
//! process it is read directly by pooled threads. For worker processes the
//! parent forwards the moment it is raised over the worker protocol, and the
//! worker mirrors it in a local atomic.

use tokio_util::sync::CancellationToken;

/// A synchronized, raise-once boolean.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    token: CancellationToken,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Raising twice is a no-op.
    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag is raised (immediately if it already is).
    pub async fn raised(&self) {
        self.token.cancelled().await
    }
}

/// The two flags every offloaded unit observes: its own job's flag and the
/// process-wide exit flag. Either one aborts the unit.
#[derive(Debug, Clone)]
pub struct FlagPair {
    pub job: CancelFlag,
    pub exit: CancelFlag,
}

impl FlagPair {
    /// A fresh job flag paired with the shared exit flag.
    pub fn new(exit: CancelFlag) -> Self {
        Self {
            job: CancelFlag::new(),
            exit,
        }
    }

    pub fn is_raised(&self) -> bool {
        self.job.is_raised() || self.exit.is_raised()
    }
}
