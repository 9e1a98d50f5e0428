use super::core::Task;
use super::state::{CANCELLED, COMPLETED};
use crate::job::TaskId;

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

use thiserror::Error;

/// Why a task produced no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("{0} was cancelled")]
    Cancelled(TaskId),

    #[error("{0} panicked")]
    Panicked(TaskId),
}

/// A handle to a spawned task.
///
/// A `JoinHandle` implements [`Future`] and resolves once the task has
/// completed or was aborted.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    /// Id of the task, as carried by every job it produces.
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    /// Cancels the task. It is not polled again; awaiting the handle yields
    /// [`JoinError::Cancelled`] unless the task had already finished.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.task.state.load(Ordering::Acquire), COMPLETED | CANCELLED)
    }

    fn outcome(&self) -> Option<Result<T, JoinError>> {
        match self.task.state.load(Ordering::Acquire) {
            // SAFETY: the result is written before COMPLETED is published and
            // only the single join handle reads it.
            COMPLETED => unsafe { (*self.task.result.get()).take() },
            CANCELLED => Some(Err(JoinError::Cancelled(self.task.id()))),
            _ => None,
        }
    }
}

impl<T: Send + 'static> Future for JoinHandle<T> {
    type Output = Result<T, JoinError>;

    /// Registers the waker **before** re-checking the state, so a completion
    /// racing with the first check is not missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.outcome() {
            return Poll::Ready(outcome);
        }

        self.task.waiters.lock().push(cx.waker().clone());

        match self.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}
