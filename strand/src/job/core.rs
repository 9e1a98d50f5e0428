use super::JobPriority;
use crate::executor::{UnownedSerialExecutor, UnownedTaskExecutor};
use crate::runtime::context;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Process-unique identifier of a task.
///
/// Jobs produced by the task layer carry the id of the task they resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates a fresh task id.
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// An opaque unit of schedulable work.
///
/// A `Job` is produced by whoever has runnable work and is consumed exactly
/// once by an executor: [`run`](Self::run) takes `self` by value, so a job
/// cannot be executed twice. Dropping a job without running it discards the
/// work.
pub struct Job {
    id: JobId,
    task_id: Option<TaskId>,
    priority: JobPriority,
    work: Box<dyn FnOnce() + Send + 'static>,
}

impl Job {
    /// Creates a job that runs `work` at the given priority.
    pub fn new<F>(priority: JobPriority, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: JobId::next(),
            task_id: None,
            priority,
            work: Box::new(work),
        }
    }

    /// Creates a job that resumes the task `task_id`.
    pub fn for_task<F>(task_id: TaskId, priority: JobPriority, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            task_id: Some(task_id),
            ..Self::new(priority, work)
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// The task this job belongs to, if it was produced by the task layer.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    /// Runs the job, consuming it.
    pub fn run(self) {
        (self.work)()
    }

    /// Runs the job with `executor` installed as the active serial
    /// executor of this thread.
    ///
    /// Serial executors implemented outside this crate call this from their
    /// run step, so isolation checks made by the job see them.
    ///
    /// # Safety
    ///
    /// `executor` must reference a live executor that outlives the job's run.
    /// Isolation checks made while the job runs dereference it.
    pub unsafe fn run_on(self, executor: UnownedSerialExecutor) {
        context::enter_serial(executor, || self.run())
    }

    /// Runs the job with `executor` installed as the task executor of this
    /// thread.
    ///
    /// # Safety
    ///
    /// Same as [`run_on`](Self::run_on).
    pub unsafe fn run_on_task_executor(self, executor: UnownedTaskExecutor) {
        context::enter_task_executor(executor, || self.run())
    }

    /// Wraps this job into a new one with the same identity and priority.
    ///
    /// When the returned job runs, it hands the original job to `forward`
    /// instead of executing it. Executors that delegate timing to another
    /// executor use this to route a fired job back to themselves.
    pub fn redirect<F>(self, forward: F) -> Job
    where
        F: FnOnce(Job) + Send + 'static,
    {
        let id = self.id;
        let task_id = self.task_id;
        let priority = self.priority;

        Job {
            id,
            task_id,
            priority,
            work: Box::new(move || forward(self)),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("task_id", &self.task_id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
