/// Task is idle and not scheduled.
///
/// The future returned `Poll::Pending` and waits for its waker.
pub(crate) const IDLE: usize = 0;

/// A job resuming the task has been routed to an executor.
pub(crate) const QUEUED: usize = 1;

/// The future is being polled.
///
/// At most one thread may observe this state at a time.
pub(crate) const RUNNING: usize = 2;

/// The future returned `Poll::Ready` or panicked; the outcome is stored.
pub(crate) const COMPLETED: usize = 3;

/// Woken while running; re-routed once the current poll returns.
pub(crate) const NOTIFIED: usize = 4;

/// Aborted through its join handle; never polled again.
pub(crate) const CANCELLED: usize = 5;
