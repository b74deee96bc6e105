//! Evaluator: maps one [`Expression`] to either immediate text or a new job.

use crate::ast::Expression;
use crate::jobs::{JobRegistry, RegistryError};
use crate::scheduler::{ExecHandle, Substrate};
use crate::shutdown::ShutdownReason;

/// Printed by `quit`.
pub const EXITING: &str = "Exiting";

/// Result of evaluating one expression.
#[derive(Debug)]
pub enum Evaluation {
    /// Text to print now.
    Immediate(String),
    /// A started job, to be registered by the caller.
    Submit(ExecHandle),
}

/// Borrowed view of the state an expression is evaluated against.
pub struct Evaluator<'a> {
    registry: &'a JobRegistry,
    substrate: &'a Substrate,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a JobRegistry, substrate: &'a Substrate) -> Self {
        Self {
            registry,
            substrate,
        }
    }

    pub fn evaluate(&self, expr: &Expression) -> Result<Evaluation, RegistryError> {
        tracing::debug!(%expr, "evaluate");
        let evaluation = match expr {
            Expression::Dex { id } => Evaluation::Submit(self.substrate.dex(*id)),
            Expression::DexMulti { ids } => {
                Evaluation::Submit(self.substrate.dex_multi(ids.clone()))
            }
            Expression::Fib { nth } => Evaluation::Submit(self.substrate.fib(*nth)),
            Expression::FibMulti { nths } => {
                Evaluation::Submit(self.substrate.fib_multi(nths.clone()))
            }
            Expression::JobStatus { index } => {
                Evaluation::Immediate(self.registry.status(*index)?)
            }
            Expression::Kill { index } => Evaluation::Immediate(self.registry.cancel(*index)?),
            Expression::Dash => Evaluation::Immediate(self.registry.dashboard()),
            Expression::Quit => {
                self.substrate.shutdown().trigger(ShutdownReason::Quit);
                Evaluation::Immediate(EXITING.to_string())
            }
        };
        Ok(evaluation)
    }
}
