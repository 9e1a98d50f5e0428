use super::core::{Schedule, Task};
use super::handle::JoinHandle;
use crate::dispatch::Isolation;
use crate::executor::{SerialExecutor, TaskExecutor};
use crate::job::JobPriority;
use crate::runtime::context;

use std::sync::Arc;

/// Configures a task before spawning it.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = task::Builder::new()
///     .priority(JobPriority::USER_INITIATED)
///     .executor_preference(pool.clone())
///     .spawn(async { 42 });
/// ```
#[derive(Default)]
pub struct Builder {
    priority: JobPriority,
    isolation: Isolation,
    preference: Option<Arc<dyn TaskExecutor>>,
}

impl Builder {
    /// A nonisolated task at medium priority with no executor preference.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Pins the task to an isolation domain. Isolated tasks ignore their
    /// executor preference.
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Asks for nonisolated work to run on `executor`.
    pub fn executor_preference(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.preference = Some(executor);
        self
    }

    /// Takes over the preference of the calling task or scope, if any.
    pub fn inherit_preference(mut self) -> Self {
        self.preference = context::preferred_task_executor();
        self
    }

    /// Spawns `future` and routes its first job.
    pub fn spawn<F, T>(self, future: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let task = Arc::new(Task::new(
            future,
            Schedule {
                priority: self.priority,
                isolation: self.isolation,
                preference: self.preference,
            },
        ));

        tracing::trace!(task = %task.id(), "spawn");

        task.clone().schedule();

        JoinHandle { task }
    }
}

/// Spawns an unstructured, nonisolated task.
///
/// The task does **not** inherit the caller's executor preference: it runs
/// on the process-wide default executor.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Builder::new().spawn(future)
}

/// Spawns a child task that inherits the caller's executor preference.
pub fn spawn_child<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Builder::new().inherit_preference().spawn(future)
}

/// Spawns a task isolated to `executor`: every poll runs as a job of that
/// serial executor.
pub fn spawn_isolated<F, T>(executor: Arc<dyn SerialExecutor>, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Builder::new()
        .isolation(Isolation::Serial(executor))
        .spawn(future)
}

/// Spawns a task isolated to the process-wide main executor.
pub fn spawn_on_main<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Builder::new().isolation(Isolation::Main).spawn(future)
}

/// Spawns a nonisolated task preferring `executor`.
pub fn spawn_with_executor<F, T>(executor: Arc<dyn TaskExecutor>, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    Builder::new().executor_preference(executor).spawn(future)
}
