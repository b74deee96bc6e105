//! Job registry.
//!
//! An append-only list of submitted jobs, addressed by 1-based index in
//! submission order. Indices are never reused or removed.

use crate::scheduler::{ExecHandle, JobOutcome};

/// Reported by `job` while a job is still running.
pub const STILL_WAITING: &str = "Still waiting";

/// Width of the dashboard's command column and result excerpt.
pub const DASH_WIDTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no job {index} (there are {count} jobs)")]
    OutOfRange { index: usize, count: usize },
}

/// One submitted job.
#[derive(Debug)]
pub struct Job {
    pub index: usize,
    /// The command line that created the job.
    pub label: String,
    pub handle: ExecHandle,
}

impl Job {
    pub fn is_done(&self) -> bool {
        self.handle.is_done()
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        self.handle.outcome()
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job and return its index.
    pub fn submit(&mut self, label: impl Into<String>, handle: ExecHandle) -> usize {
        let index = self.jobs.len() + 1;
        let label = label.into();
        tracing::info!(index, %label, strategy = %handle.strategy(), "job submitted");
        self.jobs.push(Job {
            index,
            label,
            handle,
        });
        index
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Job, RegistryError> {
        index
            .checked_sub(1)
            .and_then(|i| self.jobs.get(i))
            .ok_or(RegistryError::OutOfRange {
                index,
                count: self.jobs.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// The job's result, or [`STILL_WAITING`].
    pub fn status(&self, index: usize) -> Result<String, RegistryError> {
        let job = self.get(index)?;
        Ok(match job.outcome() {
            Some(outcome) => outcome.to_string(),
            None => STILL_WAITING.to_string(),
        })
    }

    /// Request cancellation. Succeeds even if the job already finished.
    pub fn cancel(&self, index: usize) -> Result<String, RegistryError> {
        let job = self.get(index)?;
        tracing::info!(index, label = %job.label, done = job.is_done(), "cancel requested");
        job.handle.cancel();
        Ok(format!("Task \"{}\" is killed", job.label))
    }

    /// Tab-separated table of every job.
    pub fn dashboard(&self) -> String {
        let mut rows = vec![
            format!("id\t{:<DASH_WIDTH$}\tdone?\tresult", "command"),
            format!("==\t{}\t=====\t======", "=".repeat(DASH_WIDTH)),
        ];

        for job in &self.jobs {
            let result = job
                .outcome()
                .map(|outcome| truncate(&outcome.to_string(), DASH_WIDTH))
                .unwrap_or_default();
            rows.push(format!(
                "{}\t{:<DASH_WIDTH$}\t{}\t{}",
                job.index,
                truncate(&job.label, DASH_WIDTH),
                if job.is_done() { "True" } else { "False" },
                result,
            ));
        }

        rows.join("\n")
    }
}

/// First `width` characters of `text`.
fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
