use crate::executor::{Executor, TaskExecutor, UnownedTaskExecutor};
use crate::job::Job;
use crate::runtime::builder::ThreadPoolBuilder;
use crate::runtime::context;
use crate::runtime::executor::worker::Worker;
use crate::runtime::timer::{TimerDriver, deadline_after};
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;
use crate::time::{Clock, ClockInstant};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// State shared between a [`ThreadPoolExecutor`] handle, its workers and its
/// timer thread.
///
/// This is also the object behind the pool's [`UnownedTaskExecutor`], so the
/// identity workers install and the identity handed to callers agree.
pub(crate) struct PoolShared {
    /// Prefix for worker and timer thread names.
    name: String,

    /// Back-reference handed to the timer thread.
    this: Weak<PoolShared>,

    /// Global injector queue shared by all workers.
    pub(crate) injector: Injector,

    /// One local queue per worker.
    pub(crate) locals: Vec<LocalQueue>,

    /// Started on the first delayed enqueue.
    timer: OnceCell<TimerDriver>,
}

impl PoolShared {
    fn new(name: String, threads: usize) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name,
            this: this.clone(),
            injector: Injector::new(),
            locals: (0..threads).map(|_| LocalQueue::new()).collect(),
            timer: OnceCell::new(),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn addr(&self) -> usize {
        self as *const Self as usize
    }

    fn timer(&self) -> &TimerDriver {
        self.timer.get_or_init(|| {
            let pool = self.this.clone();

            tracing::debug!(pool = %self.name, "starting timer thread");

            TimerDriver::start(format!("{}-timer", self.name), move |job| {
                if let Some(pool) = pool.upgrade() {
                    pool.enqueue(job);
                }
            })
        })
    }

    fn shutdown(&self) {
        self.injector.shutdown();

        if let Some(timer) = self.timer.get() {
            timer.shutdown();
        }
    }
}

impl Executor for PoolShared {
    /// Pushes `job` to the calling worker's local queue when called from one
    /// of this pool's workers, otherwise to the global injector.
    ///
    /// Jobs enqueued after shutdown has begun are dropped.
    fn enqueue(&self, job: Job) {
        if self.injector.is_shutdown() {
            tracing::warn!(pool = %self.name, job = %job.id(), "pool shut down, dropping job");
            return;
        }

        tracing::trace!(pool = %self.name, job = %job.id(), "enqueue");

        match context::current_worker() {
            Some((pool, index)) if pool == self.addr() => {
                self.locals[index].push(job);
                self.injector.notify();
            }
            _ => self.injector.push(job),
        }
    }

    fn supports_scheduling(&self) -> bool {
        true
    }

    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        _clock: &dyn Clock,
    ) {
        self.timer().schedule(deadline_after(delay), tolerance, job);
    }

    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        let remaining = clock.now().duration_to(instant);

        self.timer().schedule(deadline_after(remaining), tolerance, job);
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl TaskExecutor for PoolShared {
    fn as_unowned_task_executor(&self) -> UnownedTaskExecutor {
        UnownedTaskExecutor::new(self)
    }
}

/// Multi-threaded work-stealing task executor.
///
/// The `ThreadPoolExecutor` is responsible for:
/// - spawning worker threads,
/// - distributing jobs via work-stealing,
/// - holding delayed jobs on a timer thread until they are due,
/// - managing orderly shutdown and thread joining.
///
/// Jobs run concurrently, so a pool is a [`TaskExecutor`] and never a serial
/// one. Dropping the pool runs every job already enqueued, then joins the
/// workers.
pub struct ThreadPoolExecutor {
    shared: Arc<PoolShared>,

    /// Join handles for worker threads.
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPoolExecutor {
    /// Creates a pool with `threads` workers and default thread names.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn new(threads: usize) -> Self {
        ThreadPoolBuilder::new()
            .worker_threads(threads)
            .build()
    }

    /// Returns a builder to configure a pool.
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    /// Spawns the workers.
    ///
    /// # Arguments
    ///
    /// * `name` - Prefix of the worker thread names
    /// * `threads` - Number of worker threads
    pub(crate) fn start(name: String, threads: usize) -> Self {
        let shared = PoolShared::new(name, threads);
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, shared.clone());

            let handle = thread::Builder::new()
                .name(format!("{}-{id}", shared.name()))
                .spawn(move || worker.run())
                .expect("failed to spawn worker thread");

            handles.push(handle);
        }

        tracing::debug!(pool = %shared.name(), threads, "thread pool started");

        Self {
            shared,
            handles: Mutex::new(handles),
        }
    }

    /// Number of worker threads.
    pub fn worker_threads(&self) -> usize {
        self.shared.locals.len()
    }

    /// Number of jobs waiting in any queue.
    pub fn pending_jobs(&self) -> usize {
        self.shared.injector.len() + self.shared.locals.iter().map(LocalQueue::len).sum::<usize>()
    }

    /// Stops accepting jobs, lets the workers drain what is queued and
    /// waits for them.
    ///
    /// Delayed jobs that are not due yet are dropped. Calling this from one
    /// of the pool's own workers does not wait for that worker.
    pub fn shutdown(&self) {
        self.shared.shutdown();

        let current = thread::current().id();
        for handle in self.handles.lock().drain(..) {
            if handle.thread().id() == current {
                continue;
            }

            let _ = handle.join();
        }

        tracing::debug!(pool = %self.shared.name(), "thread pool stopped");
    }
}

impl Executor for ThreadPoolExecutor {
    fn enqueue(&self, job: Job) {
        self.shared.enqueue(job);
    }

    fn supports_scheduling(&self) -> bool {
        true
    }

    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        self.shared.enqueue_after(job, delay, tolerance, clock);
    }

    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        self.shared.enqueue_at(job, instant, tolerance, clock);
    }

    fn label(&self) -> String {
        self.shared.label()
    }
}

impl TaskExecutor for ThreadPoolExecutor {
    /// The identity of the pool's shared state, which is what workers install
    /// as their current task executor.
    fn as_unowned_task_executor(&self) -> UnownedTaskExecutor {
        self.shared.as_unowned_task_executor()
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
