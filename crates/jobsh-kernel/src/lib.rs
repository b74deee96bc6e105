//! jobsh-kernel: the core of jobsh.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes command lines using logos
//! - **Parser**: Builds an [`Expression`] from tokens using chumsky
//! - **Job registry**: Append-only list of submitted jobs with status, kill and dashboard
//! - **Scheduler**: Cooperative tasks, a bounded thread pool and worker processes
//! - **Shutdown**: One-shot coordinator triggered by quit, signals or faults
//! - **Kernel**: Ties the above into one evaluation cycle per line

pub mod ast;
pub mod config;
pub mod eval;
pub mod jobs;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod scheduler;
pub mod shutdown;
pub mod units;

pub use ast::Expression;
pub use config::{KernelConfig, OffloadMode, WorkerCommand};
pub use jobs::{JobRegistry, RegistryError, STILL_WAITING};
pub use kernel::{Kernel, KernelError, Reply};
pub use scheduler::serve_worker;
pub use shutdown::{Shutdown, ShutdownReason, listen_for_signals};
pub use units::{CANCELLED, Catalog, UnitError};
