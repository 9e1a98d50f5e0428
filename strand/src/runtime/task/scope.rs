use super::builder::spawn;
use crate::executor::{TaskExecutor, UnownedSerialExecutor, UnownedTaskExecutor};
use crate::runtime::context;

use std::sync::Arc;
use std::sync::mpsc;

/// The executor the calling code is running on, as far as routing is
/// concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentExecutor {
    /// A task executor: either the preference of the running task or scope,
    /// or the pool whose worker runs the current job.
    Task(UnownedTaskExecutor),

    /// The serial executor running the current job.
    Serial(UnownedSerialExecutor),
}

/// Looks up the executor of the calling context.
///
/// In order of precedence: the executor preference of the running task or
/// scope, the active serial executor, the task executor whose thread runs
/// the current job. `None` outside of any executor.
///
/// The returned handles are valid while the calling job or scope runs.
pub fn current_executor() -> Option<CurrentExecutor> {
    if let Some(preference) = context::preferred_task_executor() {
        return Some(CurrentExecutor::Task(preference.as_unowned_task_executor()));
    }

    if let Some(executor) = context::current_executor() {
        return Some(CurrentExecutor::Serial(executor));
    }

    context::current_task_executor().map(CurrentExecutor::Task)
}

/// Runs `f` with `executor` as the task executor preference.
///
/// Child tasks spawned inside `f` with [`spawn_child`](super::spawn_child)
/// prefer `executor`; unstructured [`spawn`] ignores it. The previous
/// preference is restored when `f` returns.
pub fn with_task_executor_preference<R>(
    executor: Arc<dyn TaskExecutor>,
    f: impl FnOnce() -> R,
) -> R {
    context::enter_preference(Some(executor), f)
}

/// Runs a future to completion, blocking the current thread.
///
/// The future is spawned onto the default executor and its result is sent
/// back through a channel. Calling this from a job of an executor the
/// future needs (for instance the only worker of the default pool) will
/// deadlock.
///
/// # Panics
///
/// Panics if the future panics or its task is dropped before completing.
///
/// # Examples
///
/// ```rust,ignore
/// let result = task::block_on(async { 42 });
/// assert_eq!(result, 42);
/// ```
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let (transmitter, receiver) = mpsc::channel();

    spawn(async move {
        let result = future.await;
        let _ = transmitter.send(result);
    });

    match receiver.recv() {
        Ok(result) => result,
        Err(_) => panic!("block_on: task finished without producing a value"),
    }
}
