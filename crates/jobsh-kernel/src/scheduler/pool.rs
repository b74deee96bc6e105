//! In-process offload onto a bounded pool of blocking threads.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use super::flag::FlagPair;
use super::{Offload, OffloadError, join_error_message};
use crate::config::OffloadMode;
use crate::units::{Work, WorkOutcome};

/// Runs units on tokio's blocking pool, at most `size` at a time.
pub struct ThreadPool {
    permits: Arc<Semaphore>,
}

impl ThreadPool {
    /// A pool admitting `size` concurrent units (at least one).
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }
}

#[async_trait]
impl Offload for ThreadPool {
    fn mode(&self) -> OffloadMode {
        OffloadMode::Threads
    }

    async fn run(&self, work: Work, flags: FlagPair) -> Result<WorkOutcome, OffloadError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| OffloadError::PoolClosed)?;

        debug!(%work, "running on pool thread");
        let running = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work.run(|| flags.is_raised())
        });

        match running.await {
            Ok(result) => Ok(result?),
            Err(e) => Err(OffloadError::Panicked(join_error_message(e))),
        }
    }
}
