use crate::executor::{TaskExecutor, UnownedSerialExecutor, UnownedTaskExecutor};

use std::cell::{Cell, RefCell};
use std::sync::Arc;

thread_local! {
    /// Serial executor whose job is running on this thread.
    ///
    /// Installed by serial executors for the duration of each job. This is
    /// what isolation checks compare against.
    pub(crate) static CURRENT_EXECUTOR: Cell<Option<UnownedSerialExecutor>> =
        const { Cell::new(None) };

    /// Task executor whose thread is running the current job.
    pub(crate) static CURRENT_TASK_EXECUTOR: Cell<Option<UnownedTaskExecutor>> =
        const { Cell::new(None) };

    /// Task executor preference of the running task or scope.
    ///
    /// Held strongly: the preference keeps its executor alive while the
    /// scope that installed it is active.
    pub(crate) static PREFERRED_TASK_EXECUTOR: RefCell<Option<Arc<dyn TaskExecutor>>> =
        const { RefCell::new(None) };

    /// Pool address and local queue index when this thread is a pool worker.
    pub(crate) static CURRENT_WORKER: Cell<Option<(usize, usize)>> = const { Cell::new(None) };
}

/// Runs `f` with `executor` installed as the active serial executor.
///
/// The previous value is restored afterwards, so serial executors can nest
/// (a job on one queue draining another synchronously).
pub(crate) fn enter_serial<R>(executor: UnownedSerialExecutor, f: impl FnOnce() -> R) -> R {
    with_cell(&CURRENT_EXECUTOR, Some(executor), f)
}

/// Runs `f` with `executor` installed as the task executor of this thread.
pub(crate) fn enter_task_executor<R>(executor: UnownedTaskExecutor, f: impl FnOnce() -> R) -> R {
    with_cell(&CURRENT_TASK_EXECUTOR, Some(executor), f)
}

/// Runs `f` with `preference` installed as the task executor preference.
pub(crate) fn enter_preference<R>(
    preference: Option<Arc<dyn TaskExecutor>>,
    f: impl FnOnce() -> R,
) -> R {
    struct Restore(Option<Arc<dyn TaskExecutor>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            PREFERRED_TASK_EXECUTOR.with(|cell| *cell.borrow_mut() = previous);
        }
    }

    let previous = PREFERRED_TASK_EXECUTOR.with(|cell| cell.replace(preference));
    let _restore = Restore(previous);

    f()
}

/// Marks this thread as worker `index` of the pool at `pool` while `f` runs.
pub(crate) fn enter_worker<R>(pool: usize, index: usize, f: impl FnOnce() -> R) -> R {
    with_cell(&CURRENT_WORKER, Some((pool, index)), f)
}

pub(crate) fn current_worker() -> Option<(usize, usize)> {
    CURRENT_WORKER.with(Cell::get)
}

pub(crate) fn current_executor() -> Option<UnownedSerialExecutor> {
    CURRENT_EXECUTOR.with(Cell::get)
}

pub(crate) fn current_task_executor() -> Option<UnownedTaskExecutor> {
    CURRENT_TASK_EXECUTOR.with(Cell::get)
}

pub(crate) fn preferred_task_executor() -> Option<Arc<dyn TaskExecutor>> {
    PREFERRED_TASK_EXECUTOR.with(|cell| cell.borrow().clone())
}

fn with_cell<T: Copy + 'static, R>(
    key: &'static std::thread::LocalKey<Cell<T>>,
    value: T,
    f: impl FnOnce() -> R,
) -> R {
    struct Restore<T: Copy + 'static> {
        key: &'static std::thread::LocalKey<Cell<T>>,
        previous: T,
    }

    impl<T: Copy + 'static> Drop for Restore<T> {
        fn drop(&mut self) {
            let previous = self.previous;
            self.key.with(|cell| cell.set(previous));
        }
    }

    let previous = key.with(|cell| cell.replace(value));
    let _restore = Restore { key, previous };

    f()
}
