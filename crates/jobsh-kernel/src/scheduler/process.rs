//! Offload into short-lived worker processes.
//!
//! Each unit gets a fresh worker. The only state shared with it is the pair of
//! cancellation flags, forwarded over the worker's stdin the moment they are
//! raised; the result comes back as a single line on its stdout.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::flag::FlagPair;
use super::protocol::{FlagName, FromWorker, ToWorker, encode};
use super::{Offload, OffloadError};
use crate::config::{OffloadMode, WorkerCommand};
use crate::units::{Work, WorkOutcome};

/// Runs each unit in its own worker process, at most `size` at a time.
pub struct ProcessPool {
    permits: Arc<Semaphore>,
    command: WorkerCommand,
}

impl ProcessPool {
    pub fn new(size: usize, command: WorkerCommand) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            command,
        }
    }
}

fn protocol_error(e: impl std::fmt::Display) -> OffloadError {
    OffloadError::WorkerProtocol(e.to_string())
}

async fn send(stdin: &mut ChildStdin, message: &ToWorker) -> Result<(), OffloadError> {
    let line = encode(message).map_err(protocol_error)?;
    stdin.write_all(line.as_bytes()).await.map_err(protocol_error)?;
    stdin.flush().await.map_err(protocol_error)
}

/// Forward a raised flag. A worker that already exited cannot be told, which
/// is fine: its reply (or lack of one) settles the job.
async fn forward(stdin: &mut ChildStdin, flag: FlagName) {
    if let Err(e) = send(stdin, &ToWorker::Raise(flag)).await {
        debug!(?flag, error = %e, "could not forward flag to worker");
    }
}

#[async_trait]
impl Offload for ProcessPool {
    fn mode(&self) -> OffloadMode {
        OffloadMode::Processes
    }

    async fn run(&self, work: Work, flags: FlagPair) -> Result<WorkOutcome, OffloadError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OffloadError::PoolClosed)?;

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(OffloadError::WorkerSpawn)?;
        debug!(pid = ?child.id(), %work, "worker started");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| protocol_error("worker stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| protocol_error("worker stdout not captured"))?;
        let mut replies = BufReader::new(stdout).lines();

        send(&mut stdin, &ToWorker::Run(work)).await?;

        let mut cancel_sent = false;
        let mut exit_sent = false;
        let reply = loop {
            tokio::select! {
                line = replies.next_line() => break line,
                _ = flags.job.raised(), if !cancel_sent => {
                    cancel_sent = true;
                    forward(&mut stdin, FlagName::Cancel).await;
                }
                _ = flags.exit.raised(), if !exit_sent => {
                    exit_sent = true;
                    forward(&mut stdin, FlagName::Exit).await;
                }
            }
        };
        drop(stdin);

        let status = child.wait().await.map_err(protocol_error)?;
        debug!(%status, "worker exited");

        match reply.map_err(protocol_error)? {
            Some(line) => {
                let message: FromWorker = serde_json::from_str(&line).map_err(protocol_error)?;
                Ok(message.into_result()?)
            }
            None if flags.is_raised() => {
                debug!(%status, "worker exited without reply after cancellation");
                Ok(WorkOutcome::Cancelled)
            }
            None => {
                warn!(%status, "worker exited without reply");
                Err(OffloadError::WorkerExited(status.to_string()))
            }
        }
    }
}
