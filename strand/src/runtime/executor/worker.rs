use crate::executor::TaskExecutor;
use crate::job::Job;
use crate::runtime::context;
use crate::runtime::executor::core::PoolShared;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long an idle worker sleeps before looking for
/// stealable work again.
const PARK_TIMEOUT: Duration = Duration::from_millis(10);

/// A worker thread of a [`ThreadPoolExecutor`](super::core::ThreadPoolExecutor).
///
/// The execution order is:
/// 1. Pop from the local queue
/// 2. Steal from the global injector
/// 3. Steal from other workers
/// 4. Park if no work is available
///
/// Once shutdown starts, a worker keeps going until every queue is empty.
pub(crate) struct Worker {
    /// Index of this worker's local queue.
    id: usize,

    pool: Arc<PoolShared>,
}

impl Worker {
    pub(crate) fn new(id: usize, pool: Arc<PoolShared>) -> Self {
        Self { id, pool }
    }

    /// Runs the worker loop on the calling thread.
    ///
    /// The pool is installed as the current task executor for every job.
    pub(crate) fn run(self) {
        let executor = self.pool.as_unowned_task_executor();

        context::enter_worker(self.pool.addr(), self.id, || {
            context::enter_task_executor(executor, || self.work_loop())
        });
    }

    fn work_loop(&self) {
        loop {
            if let Some(job) = self.next_job() {
                self.execute(job);
                continue;
            }

            if self.pool.injector.is_shutdown() {
                break;
            }

            self.pool.injector.park(PARK_TIMEOUT);
        }
    }

    fn next_job(&self) -> Option<Job> {
        self.pool.locals[self.id]
            .pop()
            .or_else(|| self.pool.injector.steal())
            .or_else(|| self.try_steal())
    }

    /// Attempts to steal a job from another worker's local queue.
    ///
    /// Workers are visited round-robin starting after this one.
    fn try_steal(&self) -> Option<Job> {
        let len = self.pool.locals.len();

        if len <= 1 {
            return None;
        }

        (1..len)
            .map(|i| (self.id + i) % len)
            .find_map(|victim| self.pool.locals[victim].steal())
    }

    fn execute(&self, job: Job) {
        let id = job.id();

        tracing::trace!(pool = %self.pool.name(), worker = self.id, job = %id, "run");

        if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
            tracing::warn!(pool = %self.pool.name(), worker = self.id, job = %id, "job panicked");
        }
    }
}
