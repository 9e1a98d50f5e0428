use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by [`yield_now`].
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    /// Pending once, with the waker already triggered, then ready.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(());
        }

        self.yielded = true;
        cx.waker().wake_by_ref();

        Poll::Pending
    }
}

/// Ends the current job of the calling task and routes a new one.
///
/// The task resumes on the same executor it would be routed to on any other
/// wake-up, behind the jobs already queued there. On a serial executor this
/// lets other work of the same domain run in between.
///
/// # Examples
///
/// ```rust,ignore
/// task::spawn(async {
///     for chunk in chunks {
///         process(chunk);
///         yield_now().await;
///     }
/// });
/// ```
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}
