//! The kernel: one evaluation cycle per input line.
//!
//! ```text
//! line ──▶ lexer ──▶ parser ──▶ Expression ──▶ Evaluator ──┬─▶ immediate text
//!                                                          └─▶ ExecHandle ──▶ JobRegistry
//! ```
//!
//! The kernel owns the job registry and the execution substrate. It must be
//! created and driven from inside a tokio runtime; all jobs it starts are
//! spawned on that runtime.

use std::sync::Arc;

use crate::config::{KernelConfig, OffloadMode, WorkerCommand};
use crate::eval::{Evaluation, Evaluator};
use crate::jobs::{JobRegistry, RegistryError};
use crate::parser::{self, SyntaxError};
use crate::scheduler::{Offload, ProcessPool, Substrate, ThreadPool};
use crate::shutdown::Shutdown;
use crate::units::{Catalog, HttpCatalog};

/// Errors from [`Kernel::execute`]. All are recoverable at the prompt except
/// `Setup`, which only [`Kernel::new`] returns.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("shutting down; no new jobs accepted")]
    Exiting,
    #[error("kernel setup failed: {0}")]
    Setup(String),
}

/// What a line produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Blank line.
    Empty,
    Output(String),
    /// A job was registered under this index.
    Submitted(usize),
}

pub struct Kernel {
    registry: JobRegistry,
    substrate: Substrate,
    shutdown: Shutdown,
}

impl Kernel {
    /// Build a kernel that looks entries up over HTTP.
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        let catalog = HttpCatalog::new(config.catalog_url.clone())
            .map_err(|e| KernelError::Setup(format!("catalog client: {e}")))?;
        Self::with_catalog(config, Arc::new(catalog))
    }

    pub fn with_catalog(
        config: KernelConfig,
        catalog: Arc<dyn Catalog>,
    ) -> Result<Self, KernelError> {
        let offload: Arc<dyn Offload> = match config.offload {
            OffloadMode::Threads => Arc::new(ThreadPool::new(config.pool_size)),
            OffloadMode::Processes => {
                let command = match config.worker {
                    Some(command) => command,
                    None => WorkerCommand::current_exe()
                        .map_err(|e| KernelError::Setup(format!("locating worker: {e}")))?,
                };
                Arc::new(ProcessPool::new(config.pool_size, command))
            }
        };
        tracing::debug!(mode = ?config.offload, pool_size = config.pool_size, "kernel created");

        let shutdown = Shutdown::new();
        let substrate = Substrate::new(
            shutdown.clone(),
            catalog,
            offload,
            config.dex_multi_pause,
        );

        Ok(Self {
            registry: JobRegistry::new(),
            substrate,
            shutdown,
        })
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Run one line through lex, parse and evaluate. New jobs are labelled
    /// with `line` exactly as given.
    pub fn execute(&mut self, line: &str) -> Result<Reply, KernelError> {
        if line.trim().is_empty() {
            return Ok(Reply::Empty);
        }

        let expr = parser::parse(line)?;
        if expr.submits_job() && self.shutdown.is_exiting() {
            return Err(KernelError::Exiting);
        }

        let evaluation = Evaluator::new(&self.registry, &self.substrate).evaluate(&expr)?;
        Ok(match evaluation {
            Evaluation::Immediate(text) => Reply::Output(text),
            Evaluation::Submit(handle) => Reply::Submitted(self.registry.submit(line, handle)),
        })
    }
}
