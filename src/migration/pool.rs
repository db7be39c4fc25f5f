// ABOUTME: Bounded worker pool used by the dump and import stages
// ABOUTME: Caps in-flight jobs with a semaphore and tracks outstanding work in a JoinSet

use crate::error::ReloadError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run-wide abort flag shared by every pool of a run.
///
/// A failing job raises it before releasing its permit, so a queued job that
/// inherits the permit sees the abort and never starts.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A pool running at most `size` jobs at once.
///
/// Jobs are spawned immediately but wait for a permit before their future is
/// first polled. The pool is drained once every pushed job has settled.
pub struct WorkerPool<T> {
    name: &'static str,
    size: usize,
    permits: Arc<Semaphore>,
    tasks: JoinSet<Result<T, ReloadError>>,
    paused: bool,
    abort: AbortSignal,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(name: &'static str, size: usize, abort: AbortSignal) -> Self {
        let size = size.max(1);
        Self {
            name,
            size,
            permits: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            paused: false,
            abort,
        }
    }

    /// A pool that starts no job until `resume()` is called
    pub fn paused(name: &'static str, size: usize, abort: AbortSignal) -> Self {
        let size = size.max(1);
        Self {
            name,
            size,
            permits: Arc::new(Semaphore::new(0)),
            tasks: JoinSet::new(),
            paused: true,
            abort,
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.permits.add_permits(self.size);
            tracing::debug!("{} pool resumed with {} workers", self.name, self.size);
        }
    }

    /// Queue a job labelled with its table name.
    ///
    /// If the run aborts before the job gets going, it settles as
    /// `ReloadError::Cancelled` without running. A job that fails raises the
    /// abort signal while still holding its permit.
    pub fn push<F>(&mut self, table: String, job: F)
    where
        F: Future<Output = Result<T, ReloadError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let abort = self.abort.clone();
        self.tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) if !abort.is_triggered() => permit,
                _ => return Err(ReloadError::Cancelled { table }),
            };

            let result = job.await;
            if matches!(result, Err(ref e) if !e.is_cancelled()) {
                abort.trigger();
            }
            result
        });
    }

    /// Wait for the next job to settle; `None` once drained
    pub async fn join_next(&mut self) -> Option<Result<T, ReloadError>> {
        let joined = self.tasks.join_next().await?;
        Some(joined.map_err(ReloadError::from).and_then(|result| result))
    }

    /// Stop starting queued jobs. Jobs already holding a permit run to completion.
    pub fn close(&self) {
        self.abort.trigger();
        self.permits.close();
    }

    /// Jobs pushed but not yet settled, queued or running
    pub fn outstanding(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_drained(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
