//! Kernel configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::units::DEFAULT_CATALOG_URL;

/// Where `fib` and `fib-multi` units run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OffloadMode {
    /// Blocking threads inside this process.
    Threads,
    /// One worker process per unit.
    #[default]
    Processes,
}

/// How to start a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Flag that puts the `jobsh` binary into worker mode.
    pub const WORKER_FLAG: &'static str = "--worker";

    /// This executable, re-invoked with `--worker`.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: vec![Self::WORKER_FLAG.to_string()],
        })
    }
}

/// Configuration for a [`Kernel`](crate::Kernel).
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub offload: OffloadMode,
    /// Bound on concurrently running offloaded units. Zero is treated as one.
    pub pool_size: usize,
    /// Worker command; `None` means [`WorkerCommand::current_exe`].
    pub worker: Option<WorkerCommand>,
    pub catalog_url: String,
    /// Pause after each lookup of `dex-multi`.
    pub dex_multi_pause: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            offload: OffloadMode::default(),
            pool_size: 5,
            worker: None,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            dex_multi_pause: Duration::from_secs(10),
        }
    }
}

impl KernelConfig {
    /// Offload to the in-process thread pool.
    pub fn threaded() -> Self {
        Self {
            offload: OffloadMode::Threads,
            ..Self::default()
        }
    }

    /// Offload to worker processes.
    pub fn processes() -> Self {
        Self {
            offload: OffloadMode::Processes,
            ..Self::default()
        }
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_worker(mut self, worker: WorkerCommand) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    pub fn with_dex_multi_pause(mut self, pause: Duration) -> Self {
        self.dex_multi_pause = pause;
        self
    }
}
