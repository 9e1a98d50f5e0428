//! State owned by an isolation domain.

use crate::dispatch::{self, Isolation};
use crate::error::{ContractViolation, fatal};
use crate::executor::Executor;
use crate::job::{Job, JobPriority};
use crate::runtime::SerialQueue;
use crate::runtime::task::{self, JoinHandle};

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Inner<S> {
    queue: SerialQueue,
    state: UnsafeCell<S>,

    /// Set while some closure holds `&mut S`.
    borrowed: AtomicBool,
}

// SAFETY: `state` is only reached through `with_state`, which runs on the
// queue (or after an isolation check against it) and refuses aliasing.
unsafe impl<S: Send> Sync for Inner<S> {}

impl<S> Inner<S> {
    fn with_state<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        struct Release<'a>(&'a AtomicBool);

        impl Drop for Release<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }

        if self.borrowed.swap(true, Ordering::AcqRel) {
            fatal(ContractViolation::ReentrantAccess {
                executor: self.queue.label().to_owned(),
            });
        }

        let _release = Release(&self.borrowed);

        // SAFETY: the flag above proves this is the only live borrow.
        f(unsafe { &mut *self.state.get() })
    }
}

/// A value that may only be touched from its own [`SerialQueue`].
///
/// `Isolated` is the smallest actor: the queue is the isolation domain and
/// the value is the state it protects. Work reaches the state either as a
/// job on the queue ([`enqueue`](Self::enqueue), [`spawn`](Self::spawn)) or,
/// from code that already runs on the queue, through
/// [`assume_isolated`](Self::assume_isolated).
///
/// Clones share the queue and the state.
///
/// # Examples
///
/// ```rust,ignore
/// let counter = Isolated::new("counter", 0u64);
///
/// counter.enqueue(|count| *count += 1);
/// let total = task::block_on(async move { counter.spawn(|count| *count).await });
/// ```
pub struct Isolated<S> {
    inner: Arc<Inner<S>>,
}

impl<S: Send + 'static> Isolated<S> {
    /// Wraps `state` in a fresh queue on the default executor.
    pub fn new(label: impl Into<String>, state: S) -> Self {
        Self::with_queue(SerialQueue::new(label), state)
    }

    /// Wraps `state` in the domain of `queue`.
    pub fn with_queue(queue: SerialQueue, state: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue,
                state: UnsafeCell::new(state),
                borrowed: AtomicBool::new(false),
            }),
        }
    }

    /// The queue guarding the state.
    pub fn queue(&self) -> &SerialQueue {
        &self.inner.queue
    }

    /// Runs `f` on the state as a job of the queue.
    pub fn enqueue<F>(&self, f: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let inner = self.inner.clone();

        self.inner
            .queue
            .enqueue(Job::new(JobPriority::default(), move || inner.with_state(f)));
    }

    /// Runs `f` on the state in a task isolated to the queue and returns its
    /// join handle.
    pub fn spawn<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let inner = self.inner.clone();
        let isolation = Isolation::serial(Arc::new(self.inner.queue.clone()));

        task::Builder::new()
            .isolation(isolation)
            .spawn(async move { inner.with_state(f) })
    }

    /// Runs `f` on the state synchronously.
    ///
    /// The caller must already be running on the queue; otherwise the
    /// process is terminated. Borrowing the state again from inside `f` is
    /// terminated as well.
    #[track_caller]
    pub fn assume_isolated<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        dispatch::assume_isolated(&self.inner.queue, || self.inner.with_state(f))
    }

    /// Whether the caller runs on the queue. Never terminates.
    pub fn is_isolated(&self) -> bool {
        dispatch::is_on_executor(&self.inner.queue)
    }
}

impl<S> Clone for Isolated<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> fmt::Debug for Isolated<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isolated")
            .field("queue", &self.inner.queue)
            .finish_non_exhaustive()
    }
}
