use crate::job::Job;

use parking_lot::{Condvar, Mutex};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global job queue of a thread pool.
///
/// Jobs enqueued from outside the pool land here before a worker picks them
/// up. The injector also owns the condition variable idle workers park on.
pub(crate) struct Injector {
    /// Jobs waiting for a worker.
    queue: Mutex<VecDeque<Job>>,

    /// Wakes parked workers.
    condvar: Condvar,

    /// Set once the pool starts shutting down.
    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes every parked worker.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);

        let _queue = self.queue.lock();
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Pushes a job and wakes one parked worker.
    pub(crate) fn push(&self, job: Job) {
        self.queue.lock().push_back(job);
        self.condvar.notify_one();
    }

    /// Wakes one parked worker without pushing anything.
    ///
    /// Used after a job lands in a worker-local queue.
    pub(crate) fn notify(&self) {
        let _queue = self.queue.lock();
        self.condvar.notify_one();
    }

    /// Parks the calling worker until a job arrives, shutdown starts or
    /// `timeout` elapses.
    ///
    /// Jobs pushed to local queues only notify, so the timeout bounds how
    /// long a stealable job can sit unnoticed.
    pub(crate) fn park(&self, timeout: Duration) {
        let mut queue = self.queue.lock();

        if self.is_shutdown() || !queue.is_empty() {
            return;
        }

        let _ = self.condvar.wait_for(&mut queue, timeout);
    }

    /// Takes the oldest job, if any.
    pub(crate) fn steal(&self) -> Option<Job> {
        self.queue.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }
}
