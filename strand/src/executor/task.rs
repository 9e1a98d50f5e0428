use super::{Executor, UnownedTaskExecutor};

/// An executor a task may prefer for its nonisolated work.
///
/// A task executor is a routing hint, not an isolation guarantee: jobs
/// enqueued on it may run concurrently. Work isolated to a serial executor
/// still runs there regardless of any task executor preference.
pub trait TaskExecutor: Executor {
    /// The non-owning identity of this executor.
    fn as_unowned_task_executor(&self) -> UnownedTaskExecutor;
}
