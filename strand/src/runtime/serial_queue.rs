use crate::error::{ContractViolation, fatal};
use crate::executor::{Executor, SerialExecutor, TaskExecutor, UnownedSerialExecutor};
use crate::job::{Job, JobPriority};
use crate::registry;
use crate::runtime::context;
use crate::time::{Clock, ClockInstant};

use parking_lot::Mutex;

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Jobs run per drain before the queue yields its target thread.
const DRAIN_BATCH: usize = 64;

/// Where a queue submits its drain jobs.
#[derive(Clone)]
enum Target {
    Task(Arc<dyn TaskExecutor>),
    Executor(Arc<dyn Executor>),
}

impl Target {
    fn enqueue(&self, job: Job) {
        match self {
            Target::Task(executor) => executor.enqueue(job),
            Target::Executor(executor) => executor.enqueue(job),
        }
    }

    fn supports_scheduling(&self) -> bool {
        match self {
            Target::Task(executor) => executor.supports_scheduling(),
            Target::Executor(executor) => executor.supports_scheduling(),
        }
    }

    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        match self {
            Target::Task(executor) => executor.enqueue_after(job, delay, tolerance, clock),
            Target::Executor(executor) => executor.enqueue_after(job, delay, tolerance, clock),
        }
    }

    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        match self {
            Target::Task(executor) => executor.enqueue_at(job, instant, tolerance, clock),
            Target::Executor(executor) => executor.enqueue_at(job, instant, tolerance, clock),
        }
    }
}

struct QueueState {
    jobs: VecDeque<Job>,

    /// A drain job is enqueued on the target or running.
    scheduled: bool,

    /// Thread currently running a drain.
    draining_on: Option<ThreadId>,
}

/// The drain job handed to the target.
///
/// When the target drops it without running it (a pool that has shut down),
/// the queue would otherwise stay scheduled forever and grow without bound.
struct DrainTicket {
    queue: Option<SerialQueue>,
}

impl DrainTicket {
    fn run(mut self) {
        if let Some(queue) = self.queue.take() {
            queue.drain();
        }
    }
}

impl Drop for DrainTicket {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.abandon();
        }
    }
}

struct QueueShared {
    label: String,
    state: Mutex<QueueState>,
    target: Target,
}

/// A serial executor layered on top of another executor.
///
/// Jobs run one at a time in FIFO order, each on some thread of the target
/// executor. At most one drain job for a queue is ever outstanding on the
/// target, which is what keeps two jobs of one queue from overlapping.
///
/// `SerialQueue` is a cheap handle: clones share the same queue and compare
/// equal, and its [`UnownedSerialExecutor`] uses complex equality, so
/// isolation checks treat every clone as the same execution context.
#[derive(Clone)]
pub struct SerialQueue {
    shared: Arc<QueueShared>,
}

impl SerialQueue {
    /// Creates a queue draining on the process-wide default executor.
    pub fn new(label: impl Into<String>) -> Self {
        Self::build(label.into(), Target::Task(registry::default_executor()))
    }

    /// Creates a queue draining on `target`.
    pub fn with_target<E>(label: impl Into<String>, target: Arc<E>) -> Self
    where
        E: Executor + 'static,
    {
        Self::build(label.into(), Target::Executor(target))
    }

    fn build(label: String, target: Target) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                label,
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    scheduled: false,
                    draining_on: None,
                }),
                target,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Number of jobs waiting to run.
    pub fn pending_jobs(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }

    fn submit_drain(&self, priority: JobPriority) {
        let ticket = DrainTicket {
            queue: Some(self.clone()),
        };

        self.shared
            .target
            .enqueue(Job::new(priority, move || ticket.run()));
    }

    /// The target dropped the drain job: discard what is queued so the next
    /// enqueue submits a fresh drain.
    fn abandon(&self) {
        let discarded = {
            let mut state = self.shared.state.lock();
            state.scheduled = false;

            mem::take(&mut state.jobs)
        };

        tracing::warn!(
            queue = %self.shared.label,
            discarded = discarded.len(),
            "target dropped the drain job, discarding queued jobs"
        );
    }

    fn drain(&self) {
        let executor = self.as_unowned_serial_executor();

        self.shared.state.lock().draining_on = Some(thread::current().id());

        context::enter_serial(executor, || {
            for _ in 0..DRAIN_BATCH {
                let Some(job) = self.shared.state.lock().jobs.pop_front() else {
                    break;
                };

                let id = job.id();
                tracing::trace!(queue = %self.shared.label, job = %id, "run");

                if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
                    tracing::warn!(queue = %self.shared.label, job = %id, "job panicked");
                }
            }
        });

        let mut state = self.shared.state.lock();
        state.draining_on = None;

        match state.jobs.front() {
            Some(next) => {
                let priority = next.priority();
                drop(state);

                self.submit_drain(priority);
            }
            None => state.scheduled = false,
        }
    }

    fn drains_on_current_thread(&self) -> bool {
        self.shared.state.lock().draining_on == Some(thread::current().id())
    }
}

impl Executor for SerialQueue {
    fn enqueue(&self, job: Job) {
        tracing::trace!(queue = %self.shared.label, job = %job.id(), "enqueue");

        let priority = job.priority();
        let needs_drain = {
            let mut state = self.shared.state.lock();
            state.jobs.push_back(job);

            !mem::replace(&mut state.scheduled, true)
        };

        if needs_drain {
            self.submit_drain(priority);
        }
    }

    /// Delayed jobs are timed by the target and come back through this
    /// queue when they fire.
    fn supports_scheduling(&self) -> bool {
        self.shared.target.supports_scheduling()
    }

    fn enqueue_after(
        &self,
        job: Job,
        delay: Duration,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        if !self.supports_scheduling() {
            fatal(ContractViolation::SchedulingUnsupported {
                executor: self.label().to_owned(),
            });
        }

        let queue = self.clone();
        let job = job.redirect(move |job| queue.enqueue(job));

        self.shared.target.enqueue_after(job, delay, tolerance, clock);
    }

    fn enqueue_at(
        &self,
        job: Job,
        instant: ClockInstant,
        tolerance: Option<Duration>,
        clock: &dyn Clock,
    ) {
        if !self.supports_scheduling() {
            fatal(ContractViolation::SchedulingUnsupported {
                executor: self.label().to_owned(),
            });
        }

        let queue = self.clone();
        let job = job.redirect(move |job| queue.enqueue(job));

        self.shared.target.enqueue_at(job, instant, tolerance, clock);
    }

    fn label(&self) -> String {
        self.shared.label.clone()
    }
}

impl SerialExecutor for SerialQueue {
    fn as_unowned_serial_executor(&self) -> UnownedSerialExecutor {
        UnownedSerialExecutor::complex_equality(self)
    }

    fn is_same_exclusive_execution_context(&self, other: &Self) -> bool {
        self == other
    }

    /// Passes when the calling thread is draining this queue right now.
    fn check_isolated(&self) {
        if !self.drains_on_current_thread() {
            fatal(ContractViolation::UnexpectedIsolation {
                expected: self.label().to_owned(),
            });
        }
    }

    fn is_isolating_current_context(&self) -> bool {
        self.drains_on_current_thread()
    }
}

impl PartialEq for SerialQueue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for SerialQueue {}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.shared.label)
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}
