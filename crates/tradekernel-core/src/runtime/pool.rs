//! Fixed-size worker pool with ordered results.
//!
//! Walk-forward folds, bootstrap resamples and surrogate spectra are
//! independent work items. The pool runs them on a dedicated rayon pool and
//! always hands results back in item order, so a sequential reduction over
//! them is bit-for-bit reproducible for any thread count.

use crate::error::{KernelError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::debug;

/// Shared handle to a fixed-size worker pool.
///
/// `WorkerPool::global()` runs on rayon's global pool instead of a dedicated
/// one.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Create a pool with `worker_threads` threads (0 = one per core).
    pub fn new(worker_threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("tradekernel-worker-{i}"))
            .build()
            .map_err(|e| KernelError::internal(format!("worker pool: {e}")))?;

        debug!(threads = pool.current_num_threads(), "Started worker pool");
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Handle onto rayon's global pool.
    #[must_use]
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Map `f` over `0..n` in parallel, returning results in index order.
    pub fn map_indexed<R, F>(&self, n: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Sync + Send,
    {
        self.install(|| (0..n).into_par_iter().map(f).collect())
    }

    /// Run three closures potentially in parallel.
    pub fn join3<A, B, C, RA, RB, RC>(&self, a: A, b: B, c: C) -> (RA, RB, RC)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        C: FnOnce() -> RC + Send,
        RA: Send,
        RB: Send,
        RC: Send,
    {
        let (ra, (rb, rc)) = self.install(|| rayon::join(a, || rayon::join(b, c)));
        (ra, rb, rc)
    }
}
