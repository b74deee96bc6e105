//! Execution substrate.
//!
//! Three ways to run a unit of work:
//!
//! - **Cooperative**: a task on the loop, cancelled at its next suspension
//!   point ([`spawn_cooperative`]).
//! - **Pooled**: a blocking thread from a bounded pool ([`ThreadPool`]).
//! - **External**: a short-lived worker process ([`ProcessPool`]).
//!
//! Offloaded units poll a [`FlagPair`] and return the `Cancelled` sentinel
//! when either flag is raised. [`Substrate`] picks the strategy per unit and
//! hands back an [`ExecHandle`] for the job registry.

mod flag;
mod handle;
mod pool;
mod process;
pub mod protocol;
mod substrate;
mod task;

use async_trait::async_trait;
use tokio::task::JoinError;

pub use flag::{CancelFlag, FlagPair};
pub use handle::{
    Completion, ExecHandle, JobOutcome, JobOutput, OffloadHandle, Strategy, TaskHandle,
};
pub use pool::ThreadPool;
pub use process::ProcessPool;
pub use protocol::{WorkerError, serve_worker};
pub use substrate::Substrate;
pub use task::spawn_cooperative;

use crate::config::OffloadMode;
use crate::units::{UnitError, Work, WorkOutcome};

/// Errors from running a unit off the loop.
///
/// Only [`OffloadError::Unit`] is the unit's own doing; everything else is a
/// fault.
#[derive(Debug, thiserror::Error)]
pub enum OffloadError {
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("unit panicked: {0}")]
    Panicked(String),
    #[error("failed to start worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("worker protocol error: {0}")]
    WorkerProtocol(String),
    #[error("worker exited without a result ({0})")]
    WorkerExited(String),
    #[error("offload pool is closed")]
    PoolClosed,
}

impl OffloadError {
    pub fn is_fault(&self) -> bool {
        !matches!(self, OffloadError::Unit(_))
    }
}

/// A place to run offloadable units.
#[async_trait]
pub trait Offload: Send + Sync {
    fn mode(&self) -> OffloadMode;

    /// Run `work` to completion, honouring both flags.
    async fn run(&self, work: Work, flags: FlagPair) -> Result<WorkOutcome, OffloadError>;
}

/// Best-effort text for a failed join.
pub(crate) fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
