//! Concrete executors and the task layer.
//!
//! The executor traits describe contracts only. This module ships the
//! implementations the process-wide registry uses by default, and that
//! callers can instantiate directly:
//! - a work-stealing [`ThreadPoolExecutor`] with a timer thread for delayed
//!   jobs,
//! - a [`SerialQueue`] layering mutual exclusion over another executor,
//! - a thread-bound [`RunLoop`] usable as main executor.
//!
//! It also holds the per-thread execution context isolation checks read,
//! and the task layer that turns futures into routed jobs.

mod executor;
mod serial_queue;
mod work_stealing;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod run_loop;
pub(crate) mod thread;
pub(crate) mod timer;
pub(crate) mod yield_now;

pub mod task;

pub use builder::ThreadPoolBuilder;
pub use executor::core::ThreadPoolExecutor;
pub use run_loop::RunLoop;
pub use serial_queue::SerialQueue;
pub use thread::is_main_thread;
