//! Units of work: the payloads jobs run.
//!
//! Units are interchangeable. Two families exist:
//!
//! - **Cooperative units** ([`dex`], [`dex_multi`]) are futures that run on the
//!   loop and are cancelled by being dropped at their next `.await`.
//! - **Offloadable units** ([`Work`]) are plain blocking functions that run on a
//!   worker thread or in a worker process. They take a cancellation predicate
//!   and poll it at bounded intervals, returning [`WorkOutcome::Cancelled`]
//!   instead of failing when it fires.

mod dex;
mod fib;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use dex::{Catalog, DEFAULT_CATALOG_URL, HttpCatalog, dex, dex_multi};
pub use fib::{fibonacci, ordinal};

/// Rendered in place of a result when a unit stopped early.
pub const CANCELLED: &str = "Cancelled";

/// A unit's own failure. Crosses the worker boundary as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum UnitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// What an offloadable unit produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOutcome {
    Done(String),
    Cancelled,
}

impl fmt::Display for WorkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkOutcome::Done(text) => f.write_str(text),
            WorkOutcome::Cancelled => f.write_str(CANCELLED),
        }
    }
}

/// An offloadable unit of work, described as data so it can be shipped to a
/// worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Work {
    Fibonacci { nth: u64 },
}

impl Work {
    /// Run the unit to completion on the current thread.
    ///
    /// `cancelled` is polled at least once per iteration of the unit's main loop.
    pub fn run(&self, cancelled: impl Fn() -> bool) -> Result<WorkOutcome, UnitError> {
        match self {
            Work::Fibonacci { nth } => fibonacci(*nth, cancelled),
        }
    }
}

impl fmt::Display for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Work::Fibonacci { nth } => write!(f, "fibonacci({nth})"),
        }
    }
}
