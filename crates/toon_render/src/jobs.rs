//! Worker pool for culling jobs

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::JobPoolConfig;
use crate::error::RenderResult;

/// A dedicated rayon pool so culling never competes with the host's global
/// pool
#[derive(Debug)]
pub struct JobPool {
    pool: ThreadPool,
}

impl JobPool {
    pub fn new(config: &JobPoolConfig) -> RenderResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("toon-cull-{}", index))
            .build()?;

        log::debug!("Culling job pool started with {} workers", pool.current_num_threads());

        Ok(Self { pool })
    }

    /// Pool with a fixed number of workers
    pub fn with_threads(worker_threads: usize) -> RenderResult<Self> {
        Self::new(&JobPoolConfig { worker_threads })
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run a job asynchronously on the pool
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }

    /// Run a closure inside the pool so that parallel iterators use its
    /// workers
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_thread_count() {
        let jobs = JobPool::with_threads(2).unwrap();
        assert_eq!(jobs.num_threads(), 2);
    }

    #[test]
    fn test_spawn_runs_job() {
        let jobs = JobPool::with_threads(1).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        jobs.spawn(move || {
            let _ = tx.send(7);
        });
        assert_eq!(rx.recv().unwrap(), 7);
    }
}
