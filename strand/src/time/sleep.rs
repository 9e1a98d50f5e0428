use super::{Clock, ClockInstant, ContinuousClock};
use crate::job::{Job, JobPriority};
use crate::registry;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

/// Creates a future that completes after the given duration.
///
/// The wake-up is a delayed job on the process-wide default executor, so that
/// executor must support scheduling; otherwise the first poll terminates the
/// process.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep::new(duration)
}

/// A future that completes once a deadline on the [`ContinuousClock`] is
/// reached.
///
/// The delayed wake-up is registered on first poll. Dropping the future turns
/// the pending wake-up into a no-op.
pub struct Sleep {
    /// Absolute point in time when the sleep completes.
    deadline: ClockInstant,

    /// Whether the wake-up job has been enqueued.
    registered: bool,

    /// Shared with the wake-up job.
    cancelled: Arc<AtomicBool>,
}

impl Sleep {
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            deadline: ContinuousClock.now().advanced(duration),
            registered: false,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if ContinuousClock.now() >= this.deadline {
            return Poll::Ready(());
        }

        if !this.registered {
            this.registered = true;

            let waker = cx.waker().clone();
            let cancelled = this.cancelled.clone();
            let wake = Job::new(JobPriority::MEDIUM, move || {
                if !cancelled.load(Ordering::Acquire) {
                    waker.wake();
                }
            });

            registry::default_executor().enqueue_at(wake, this.deadline, None, &ContinuousClock);
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
