use super::handle::JoinError;
use super::state::{CANCELLED, COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use super::waker::make_waker;
use crate::dispatch::{self, Isolation};
use crate::executor::TaskExecutor;
use crate::job::{Job, JobPriority, TaskId};
use crate::runtime::context;

use parking_lot::Mutex;

use std::cell::UnsafeCell;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// Where every job of a task is routed.
pub(crate) struct Schedule {
    pub(crate) priority: JobPriority,
    pub(crate) isolation: Isolation,
    pub(crate) preference: Option<Arc<dyn TaskExecutor>>,
}

/// A spawned asynchronous task.
///
/// A `Task` owns a future and drives it one poll per [`Job`]. Every time the
/// task becomes runnable (spawn, wake) it produces a job carrying its
/// [`TaskId`] and hands it to [`dispatch::route`] with its isolation and
/// executor preference.
pub(crate) struct Task<T> {
    id: TaskId,

    /// The underlying future.
    ///
    /// Only touched while the task is `RUNNING`, which a single thread can
    /// observe at a time.
    future: UnsafeCell<Pin<Box<dyn Future<Output = T> + Send>>>,

    /// Outcome of the future, set before the state becomes `COMPLETED`.
    pub(crate) result: UnsafeCell<Option<Result<T, JoinError>>>,

    /// The current lifecycle state of the task (IDLE, RUNNING, etc.).
    pub(crate) state: AtomicUsize,

    schedule: Schedule,

    /// Wakers of `JoinHandle`s awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

// SAFETY: the cells are only accessed under the state machine's exclusive
// states (`RUNNING` for the future, `COMPLETED` for the result).
unsafe impl<T: Send> Send for Task<T> {}
unsafe impl<T: Send> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a task in the `QUEUED` state. The caller routes its first
    /// job with [`schedule`](Self::schedule).
    pub(crate) fn new<F>(future: F, schedule: Schedule) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            id: TaskId::next(),
            future: UnsafeCell::new(Box::pin(future)),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            schedule,
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Routes a job that polls the task once.
    pub(crate) fn schedule(self: Arc<Self>) {
        let task = self.clone();
        let job = Job::for_task(self.id, self.schedule.priority, move || task.run());

        dispatch::route(
            job,
            &self.schedule.isolation,
            self.schedule.preference.as_deref(),
        );
    }

    /// Polls the future once.
    ///
    /// The task's executor preference is installed for the poll, so child
    /// tasks spawned from inside it can inherit it.
    fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        let poll = context::enter_preference(self.schedule.preference.clone(), || {
            // SAFETY: the RUNNING state guarantees no other thread is polling
            // this future.
            panic::catch_unwind(AssertUnwindSafe(|| unsafe {
                (*self.future.get()).as_mut().poll(&mut cx)
            }))
        });

        match poll {
            Ok(Poll::Pending) => {
                if self
                    .state
                    .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    return;
                }

                // Woken while running: go again. Aborted: stay cancelled.
                if self
                    .state
                    .compare_exchange(NOTIFIED, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    self.schedule();
                }
            }
            Ok(Poll::Ready(value)) => self.complete(Ok(value)),
            Err(_) => {
                tracing::warn!(task = %self.id, "task panicked");
                self.complete(Err(JoinError::Panicked(self.id)));
            }
        }
    }

    fn complete(&self, outcome: Result<T, JoinError>) {
        // SAFETY: still RUNNING (or CANCELLED by a concurrent abort, in which
        // case the result is never read).
        unsafe {
            *self.result.get() = Some(outcome);
        }

        let mut state = self.state.load(Ordering::Acquire);
        loop {
            if state == CANCELLED {
                return;
            }

            match self
                .state
                .compare_exchange(state, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => state = actual,
            }
        }

        self.wake_waiters();
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and a job is routed.
    /// If the task is `RUNNING`, it moves to `NOTIFIED` so it is re-polled
    /// right after its current poll.
    pub(crate) fn wake(self: Arc<Self>) {
        loop {
            match self.state.load(Ordering::Acquire) {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.schedule();
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Moves the task to `CANCELLED` unless it already finished.
    ///
    /// A poll in progress is not interrupted, but its outcome is discarded.
    pub(crate) fn abort(&self) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            if state == COMPLETED || state == CANCELLED {
                return;
            }

            if self
                .state
                .compare_exchange(state, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                tracing::debug!(task = %self.id, "task aborted");
                self.wake_waiters();
                return;
            }
        }
    }

    fn wake_waiters(&self) {
        let waiters = mem::take(&mut *self.waiters.lock());

        for waker in waiters {
            waker.wake();
        }
    }
}
