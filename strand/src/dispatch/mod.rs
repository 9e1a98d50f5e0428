//! The bridge between runnable work and concrete executors.
//!
//! Routing decides which executor receives a job: an isolated job always
//! goes to its domain's serial executor; nonisolated work follows the task
//! executor preference, and without one lands on the process-wide default
//! executor.
//!
//! The isolation checks in this module implement the assertion side of the
//! contract: they prove, or fatally fail to prove, that the calling context
//! is a given serial executor.

mod isolation;

pub use isolation::{
    assert_isolated, assume_isolated, check_expected_executor, is_on_executor,
    precondition_isolated, task_is_current_executor,
};

use crate::executor::{SerialExecutor, TaskExecutor, UnownedSerialExecutor, UnownedTaskExecutor};
use crate::job::{Job, JobPriority};
use crate::registry;

use std::fmt;
use std::sync::Arc;

/// The isolation requirement of a piece of work.
#[derive(Clone, Default)]
pub enum Isolation {
    /// May run anywhere, concurrently with anything.
    #[default]
    Nonisolated,

    /// Must run on this serial executor.
    Serial(Arc<dyn SerialExecutor>),

    /// Must run on the process-wide main executor.
    Main,
}

impl Isolation {
    pub fn serial<E>(executor: Arc<E>) -> Self
    where
        E: SerialExecutor + 'static,
    {
        Isolation::Serial(executor)
    }

    pub fn is_isolated(&self) -> bool {
        !matches!(self, Isolation::Nonisolated)
    }
}

impl fmt::Debug for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Isolation::Nonisolated => f.write_str("Nonisolated"),
            Isolation::Serial(executor) => {
                f.debug_tuple("Serial").field(&executor.label()).finish()
            }
            Isolation::Main => f.write_str("Main"),
        }
    }
}

/// Hands `job` to the executor its isolation and preference select.
///
/// Isolation wins over preference: a task preferring some pool still runs
/// its isolated work on the isolating executor.
pub fn route(job: Job, isolation: &Isolation, preference: Option<&dyn TaskExecutor>) {
    tracing::trace!(job = %job.id(), ?isolation, preferred = preference.is_some(), "route");

    match isolation {
        Isolation::Serial(executor) => executor.enqueue(job),
        Isolation::Main => registry::main_executor().enqueue(job),
        Isolation::Nonisolated => match preference {
            Some(executor) => executor.enqueue(job),
            None => registry::default_executor().enqueue(job),
        },
    }
}

/// Enqueues `job` on the serial executor behind `executor`.
///
/// # Safety
///
/// `executor` must reference a live executor, and it must stay alive until
/// `job` has run.
pub unsafe fn enqueue_on_executor(job: Job, executor: UnownedSerialExecutor) {
    // SAFETY: upheld by the caller.
    unsafe { executor.as_serial_executor() }.enqueue(job);
}

/// Enqueues `job` on the task executor behind `executor`.
///
/// # Safety
///
/// Same as [`enqueue_on_executor`].
pub unsafe fn enqueue_on_task_executor(job: Job, executor: UnownedTaskExecutor) {
    // SAFETY: upheld by the caller.
    unsafe { executor.as_task_executor() }.enqueue(job);
}

/// Runs `work` on `executor`: synchronously if the calling context already
/// is that executor, as an enqueued job otherwise.
///
/// Only identity and domain-aware equality are consulted, never
/// `check_isolated`, so this never terminates the process. Typical use is
/// tearing down isolated state from a destructor that may run anywhere.
pub fn perform_on<E, F>(executor: &E, work: F)
where
    E: SerialExecutor + ?Sized,
    F: FnOnce() + Send + 'static,
{
    let expected = executor.as_unowned_serial_executor();

    // SAFETY: `executor` is borrowed for the whole call.
    if unsafe { isolation::matches_current(expected) } {
        work();
        return;
    }

    executor.enqueue(Job::new(JobPriority::default(), work));
}
