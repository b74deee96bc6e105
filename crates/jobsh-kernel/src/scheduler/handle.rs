//! Execution handles: how a registered job is observed and cancelled.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use super::flag::CancelFlag;
use crate::units::CANCELLED;

/// The value a finished unit produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Text(String),
    /// One entry per element of a multi-unit job, in argument order.
    List(Vec<String>),
}

impl fmt::Display for JobOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutput::Text(text) => f.write_str(text),
            JobOutput::List(items) => f.write_str(&items.join("; ")),
        }
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Finished(JobOutput),
    Cancelled,
    Failed(String),
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Finished(output) => output.fmt(f),
            JobOutcome::Cancelled => f.write_str(CANCELLED),
            JobOutcome::Failed(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Write-once slot holding a job's outcome.
///
/// The task driving the job resolves it; the registry only reads it, so a
/// status query never blocks.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    slot: Arc<OnceLock<JobOutcome>>,
}

impl Completion {
    /// Store the outcome. Returns false if one was already stored.
    pub fn resolve(&self, outcome: JobOutcome) -> bool {
        self.slot.set(outcome).is_ok()
    }

    pub fn get(&self) -> Option<&JobOutcome> {
        self.slot.get()
    }

    pub fn is_done(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// Which execution strategy a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Cooperative,
    Pooled,
    External,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Cooperative => "cooperative",
            Strategy::Pooled => "pooled",
            Strategy::External => "external",
        })
    }
}

/// A cooperative task on the loop. Cancelled through its token.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: CancellationToken,
    completion: Completion,
}

impl TaskHandle {
    pub(crate) fn new(token: CancellationToken, completion: Completion) -> Self {
        Self { token, completion }
    }
}

/// Offloaded work. Always carries the per-job cancellation flag its units poll.
#[derive(Debug, Clone)]
pub struct OffloadHandle {
    flag: CancelFlag,
    completion: Completion,
}

impl OffloadHandle {
    pub(crate) fn new(flag: CancelFlag, completion: Completion) -> Self {
        Self { flag, completion }
    }

    pub fn flag(&self) -> &CancelFlag {
        &self.flag
    }
}

/// Handle to one registered job, whatever runs it.
#[derive(Debug, Clone)]
pub enum ExecHandle {
    Task(TaskHandle),
    Pooled(OffloadHandle),
    External(OffloadHandle),
}

impl ExecHandle {
    pub fn strategy(&self) -> Strategy {
        match self {
            ExecHandle::Task(_) => Strategy::Cooperative,
            ExecHandle::Pooled(_) => Strategy::Pooled,
            ExecHandle::External(_) => Strategy::External,
        }
    }

    fn completion(&self) -> &Completion {
        match self {
            ExecHandle::Task(h) => &h.completion,
            ExecHandle::Pooled(h) | ExecHandle::External(h) => &h.completion,
        }
    }

    pub fn is_done(&self) -> bool {
        self.completion().is_done()
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.completion().get()
    }

    /// Request cancellation. A no-op once the job has finished.
    pub fn cancel(&self) {
        match self {
            ExecHandle::Task(h) => h.token.cancel(),
            ExecHandle::Pooled(h) | ExecHandle::External(h) => h.flag.raise(),
        }
    }
}
