//! Worker process protocol.
//!
//! Newline-delimited JSON over the worker's stdin/stdout.
//!
//! ```text
//! parent → worker   {"run":{"fibonacci":{"nth":30}}}     first line, exactly once
//! parent → worker   {"raise":"cancel"} | {"raise":"exit"} any time after
//! worker → parent   {"done":"..."} | "cancelled" | {"failed":{...}}
//! ```
//!
//! The worker replies exactly once and exits. Stderr is left for logging.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::units::{UnitError, Work, WorkOutcome};

/// Which cross-process flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagName {
    /// The job's own flag.
    Cancel,
    /// The global exit flag.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToWorker {
    Run(Work),
    Raise(FlagName),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FromWorker {
    Done(String),
    Cancelled,
    Failed(UnitError),
}

impl From<Result<WorkOutcome, UnitError>> for FromWorker {
    fn from(result: Result<WorkOutcome, UnitError>) -> Self {
        match result {
            Ok(WorkOutcome::Done(text)) => FromWorker::Done(text),
            Ok(WorkOutcome::Cancelled) => FromWorker::Cancelled,
            Err(e) => FromWorker::Failed(e),
        }
    }
}

impl FromWorker {
    pub fn into_result(self) -> Result<WorkOutcome, UnitError> {
        match self {
            FromWorker::Done(text) => Ok(WorkOutcome::Done(text)),
            FromWorker::Cancelled => Ok(WorkOutcome::Cancelled),
            FromWorker::Failed(e) => Err(e),
        }
    }
}

/// Encode one message as a protocol line, newline included.
pub fn encode<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed protocol message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no run request received")]
    NoRequest,
}

/// Serve a single worker request.
///
/// Reads the run request from `input`, then hands the rest of `input` to a
/// control thread that mirrors raised flags into local atomics while the unit
/// runs on this thread. End of `input` leaves the flags as they are.
pub fn serve_worker<R, W>(mut input: R, mut output: W) -> Result<(), WorkerError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut first = String::new();
    if input.read_line(&mut first)? == 0 {
        return Err(WorkerError::NoRequest);
    }
    let work = match serde_json::from_str::<ToWorker>(&first)? {
        ToWorker::Run(work) => work,
        ToWorker::Raise(_) => return Err(WorkerError::NoRequest),
    };
    debug!(%work, pid = std::process::id(), "worker received request");

    let cancel = Arc::new(AtomicBool::new(false));
    let exit = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        let exit = Arc::clone(&exit);
        std::thread::Builder::new()
            .name("jobsh-worker-control".into())
            .spawn(move || watch_flags(input, &cancel, &exit))?;
    }

    let result = work.run(|| cancel.load(Ordering::Acquire) || exit.load(Ordering::Acquire));

    output.write_all(encode(&FromWorker::from(result))?.as_bytes())?;
    output.flush()?;
    Ok(())
}

fn watch_flags(input: impl BufRead, cancel: &AtomicBool, exit: &AtomicBool) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match serde_json::from_str::<ToWorker>(&line) {
            Ok(ToWorker::Raise(FlagName::Cancel)) => cancel.store(true, Ordering::Release),
            Ok(ToWorker::Raise(FlagName::Exit)) => exit.store(true, Ordering::Release),
            Ok(ToWorker::Run(_)) => warn!("worker ignores a second run request"),
            Err(e) => warn!(error = %e, "unreadable control message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn serve(input: &str) -> FromWorker {
        let mut output = Vec::new();
        serve_worker(Cursor::new(input.as_bytes().to_vec()), &mut output).expect("serve");
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.ends_with('\n'));
        serde_json::from_str(text.trim_end()).expect("reply")
    }

    #[test]
    fn wire_format() {
        assert_eq!(
            encode(&ToWorker::Run(Work::Fibonacci { nth: 30 })).expect("encode"),
            "{\"run\":{\"fibonacci\":{\"nth\":30}}}\n"
        );
        assert_eq!(
            encode(&ToWorker::Raise(FlagName::Exit)).expect("encode"),
            "{\"raise\":\"exit\"}\n"
        );
        assert_eq!(
            encode(&FromWorker::Cancelled).expect("encode"),
            "\"cancelled\"\n"
        );
    }

    #[test]
    fn serves_run_request() {
        let reply = serve("{\"run\":{\"fibonacci\":{\"nth\":10}}}\n");
        assert_eq!(reply, FromWorker::Done("The 10th fibonacci number is 34".into()));
    }

    #[test]
    fn unit_failure_crosses_boundary() {
        let reply = serve("{\"run\":{\"fibonacci\":{\"nth\":0}}}\n");
        assert!(matches!(reply, FromWorker::Failed(UnitError::InvalidArgument(_))));
    }

    #[test]
    fn cancel_line_stops_unit() {
        let reply = serve(
            "{\"run\":{\"fibonacci\":{\"nth\":1000000000}}}\n{\"raise\":\"cancel\"}\n",
        );
        assert_eq!(reply, FromWorker::Cancelled);
    }

    #[test]
    fn exit_line_stops_unit() {
        let reply = serve("{\"run\":{\"fibonacci\":{\"nth\":1000000000}}}\n{\"raise\":\"exit\"}\n");
        assert_eq!(reply, FromWorker::Cancelled);
    }

    #[test]
    fn missing_request_is_an_error() {
        let err = serve_worker(Cursor::new(Vec::new()), Vec::new()).expect_err("empty input");
        assert!(matches!(err, WorkerError::NoRequest));

        let err = serve_worker(Cursor::new(b"{\"raise\":\"cancel\"}\n".to_vec()), Vec::new())
            .expect_err("raise before run");
        assert!(matches!(err, WorkerError::NoRequest));
    }
}
