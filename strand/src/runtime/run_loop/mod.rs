//! A thread-bound run loop implementing [`MainExecutor`].
//!
//! The loop is driven by whichever thread calls `run`. While it runs, that
//! thread is the loop's exclusive execution context: jobs, fired timers and
//! event handlers are all dispatched from it, one at a time.
//!
//! [`MainExecutor`]: crate::executor::MainExecutor

mod core;
mod event;

pub use self::core::RunLoop;
