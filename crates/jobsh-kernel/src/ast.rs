//! Expression types for jobsh.
//!
//! A command line parses into exactly one [`Expression`]. The parser produces
//! it, the evaluator consumes it, and it is discarded after one cycle.

use std::fmt;

/// Which command an expression invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    Dex,
    DexMulti,
    Fib,
    FibMulti,
    JobStatus,
    Kill,
    Dash,
    Quit,
}

impl CommandTag {
    /// The keyword that introduces this command on the command line.
    pub fn keyword(self) -> &'static str {
        match self {
            CommandTag::Dex => "dex",
            CommandTag::DexMulti => "dex-multi",
            CommandTag::Fib => "fib",
            CommandTag::FibMulti => "fib-multi",
            CommandTag::JobStatus => "job",
            CommandTag::Kill => "kill",
            CommandTag::Dash => "dash",
            CommandTag::Quit => "quit",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// `dex <id>`: look up one catalog entry.
    Dex { id: u64 },
    /// `dex-multi <id>...`: look up entries one after another.
    DexMulti { ids: Vec<u64> },
    /// `fib <n>`: compute the nth fibonacci number off the loop.
    Fib { nth: u64 },
    /// `fib-multi <n>...`: several fibonacci numbers joined into one job.
    FibMulti { nths: Vec<u64> },
    /// `job <index>`: status of a registered job.
    JobStatus { index: usize },
    /// `kill <index>`: cancel a registered job.
    Kill { index: usize },
    /// `dash`: dashboard of all jobs.
    Dash,
    /// `quit`: shut down.
    Quit,
}

impl Expression {
    pub fn tag(&self) -> CommandTag {
        match self {
            Expression::Dex { .. } => CommandTag::Dex,
            Expression::DexMulti { .. } => CommandTag::DexMulti,
            Expression::Fib { .. } => CommandTag::Fib,
            Expression::FibMulti { .. } => CommandTag::FibMulti,
            Expression::JobStatus { .. } => CommandTag::JobStatus,
            Expression::Kill { .. } => CommandTag::Kill,
            Expression::Dash => CommandTag::Dash,
            Expression::Quit => CommandTag::Quit,
        }
    }

    /// Arguments in command-line order.
    pub fn args(&self) -> Vec<u64> {
        match self {
            Expression::Dex { id } => vec![*id],
            Expression::Fib { nth } => vec![*nth],
            Expression::DexMulti { ids } => ids.clone(),
            Expression::FibMulti { nths } => nths.clone(),
            Expression::JobStatus { index } | Expression::Kill { index } => vec![*index as u64],
            Expression::Dash | Expression::Quit => Vec::new(),
        }
    }

    /// True if evaluating this expression registers a new job.
    pub fn submits_job(&self) -> bool {
        matches!(
            self.tag(),
            CommandTag::Dex | CommandTag::DexMulti | CommandTag::Fib | CommandTag::FibMulti
        )
    }
}

/// Renders the expression back into a command line that parses to itself.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_keyword_and_args() {
        assert_eq!(Expression::Dex { id: 25 }.to_string(), "dex 25");
        assert_eq!(
            Expression::FibMulti { nths: vec![3, 4, 5] }.to_string(),
            "fib-multi 3 4 5"
        );
        assert_eq!(Expression::DexMulti { ids: vec![] }.to_string(), "dex-multi");
        assert_eq!(Expression::Dash.to_string(), "dash");
    }

    #[test]
    fn only_work_commands_submit_jobs() {
        assert!(Expression::Fib { nth: 1 }.submits_job());
        assert!(Expression::DexMulti { ids: vec![] }.submits_job());
        assert!(!Expression::Kill { index: 1 }.submits_job());
        assert!(!Expression::Quit.submits_job());
    }
}
