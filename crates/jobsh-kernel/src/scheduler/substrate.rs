use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use super::flag::FlagPair;
use super::handle::{Completion, ExecHandle, JobOutcome, JobOutput, OffloadHandle};
use super::task::spawn_cooperative;
use super::{Offload, OffloadError, join_error_message};
use crate::config::OffloadMode;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::units::{self, Catalog, Work, WorkOutcome};

/// Starts units on the right strategy and returns handles to them.
///
/// Lookups run as cooperative tasks; fibonacci units go to the configured
/// offload.
pub struct Substrate {
    shutdown: Shutdown,
    catalog: Arc<dyn Catalog>,
    offload: Arc<dyn Offload>,
    dex_multi_pause: Duration,
}

impl Substrate {
    pub fn new(
        shutdown: Shutdown,
        catalog: Arc<dyn Catalog>,
        offload: Arc<dyn Offload>,
        dex_multi_pause: Duration,
    ) -> Self {
        Self {
            shutdown,
            catalog,
            offload,
            dex_multi_pause,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn dex(&self, id: u64) -> ExecHandle {
        let catalog = Arc::clone(&self.catalog);
        ExecHandle::Task(spawn_cooperative(&self.shutdown, async move {
            units::dex(catalog.as_ref(), id).await
        }))
    }

    pub fn dex_multi(&self, ids: Vec<u64>) -> ExecHandle {
        let catalog = Arc::clone(&self.catalog);
        let pause = self.dex_multi_pause;
        ExecHandle::Task(spawn_cooperative(&self.shutdown, async move {
            units::dex_multi(catalog.as_ref(), &ids, pause).await
        }))
    }

    pub fn fib(&self, nth: u64) -> ExecHandle {
        let (flags, completion, handle) = self.prepare();
        let offload = Arc::clone(&self.offload);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let outcome = match offload.run(Work::Fibonacci { nth }, flags).await {
                Ok(WorkOutcome::Done(text)) => JobOutcome::Finished(JobOutput::Text(text)),
                Ok(WorkOutcome::Cancelled) => JobOutcome::Cancelled,
                Err(e) => settle_error(e, &shutdown),
            };
            completion.resolve(outcome);
        });

        handle
    }

    /// One offload per element, all sharing one job flag. The job completes
    /// when every element has; any failure fails the whole job, and a raised
    /// flag cancels it as a whole.
    pub fn fib_multi(&self, nths: Vec<u64>) -> ExecHandle {
        let (flags, completion, handle) = self.prepare();
        let offload = Arc::clone(&self.offload);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let runs: Vec<_> = nths
                .into_iter()
                .map(|nth| {
                    let offload = Arc::clone(&offload);
                    let flags = flags.clone();
                    tokio::spawn(async move { offload.run(Work::Fibonacci { nth }, flags).await })
                })
                .collect();

            let mut texts = Vec::with_capacity(runs.len());
            let mut cancelled = false;
            let mut failure = None;
            for run in runs {
                let error = match run.await {
                    Ok(Ok(WorkOutcome::Done(text))) => {
                        texts.push(text);
                        continue;
                    }
                    Ok(Ok(WorkOutcome::Cancelled)) => {
                        cancelled = true;
                        continue;
                    }
                    Ok(Err(e)) => e,
                    Err(e) => OffloadError::Panicked(join_error_message(e)),
                };
                if failure.is_none() {
                    failure = Some(error);
                }
            }

            let outcome = match failure {
                Some(e) => settle_error(e, &shutdown),
                None if cancelled || flags.is_raised() => JobOutcome::Cancelled,
                None => JobOutcome::Finished(JobOutput::List(texts)),
            };
            completion.resolve(outcome);
        });

        handle
    }

    fn prepare(&self) -> (FlagPair, Completion, ExecHandle) {
        let flags = FlagPair::new(self.shutdown.exit_flag().clone());
        let completion = Completion::default();
        let inner = OffloadHandle::new(flags.job.clone(), completion.clone());
        let handle = match self.offload.mode() {
            OffloadMode::Threads => ExecHandle::Pooled(inner),
            OffloadMode::Processes => ExecHandle::External(inner),
        };
        (flags, completion, handle)
    }
}

/// Turn an offload error into the job's outcome, escalating faults.
fn settle_error(e: OffloadError, shutdown: &Shutdown) -> JobOutcome {
    if e.is_fault() {
        error!(error = %e, "offloaded unit faulted");
        shutdown.trigger(ShutdownReason::Fault(e.to_string()));
    }
    JobOutcome::Failed(e.to_string())
}
