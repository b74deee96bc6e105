//! Cooperative tasks on the loop.

use std::future::Future;

use tracing::{debug, error};

use super::handle::{Completion, JobOutcome, JobOutput, TaskHandle};
use super::join_error_message;
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::units::UnitError;

/// Spawn a cooperative unit.
///
/// The unit runs until it finishes or its token is cancelled, in which case it
/// is dropped at its next suspension point. A supervising task, tracked for
/// shutdown, records the outcome; a panic in the unit is a fault and triggers
/// shutdown.
pub fn spawn_cooperative<F>(shutdown: &Shutdown, unit: F) -> TaskHandle
where
    F: Future<Output = Result<String, UnitError>> + Send + 'static,
{
    let token = shutdown.task_token();
    let completion = Completion::default();

    let running = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                result = unit => Some(result),
            }
        })
    };

    let slot = completion.clone();
    let on_fault = shutdown.clone();
    shutdown.tracker().spawn(async move {
        let outcome = match running.await {
            Ok(Some(Ok(text))) => JobOutcome::Finished(JobOutput::Text(text)),
            Ok(Some(Err(e))) => JobOutcome::Failed(e.to_string()),
            Ok(None) => {
                debug!("cooperative task cancelled");
                JobOutcome::Cancelled
            }
            Err(e) => {
                let message = join_error_message(e);
                error!(%message, "cooperative task faulted");
                on_fault.trigger(ShutdownReason::Fault(message.clone()));
                JobOutcome::Failed(message)
            }
        };
        slot.resolve(outcome);
    });

    TaskHandle::new(token, completion)
}
