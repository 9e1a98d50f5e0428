//! Executor capability traits and non-owning executor references.
//!
//! The hierarchy is:
//! - [`Executor`]: accepts jobs, optionally with a delay,
//! - [`SerialExecutor`]: an executor that is also an isolation domain,
//! - [`TaskExecutor`]: an executor usable as a task-wide preference,
//! - [`RunLoopExecutor`] and [`EventableExecutor`]: blocking run loop and
//!   coalesced event wake-ups,
//! - [`MainExecutor`]: all of the above bound to the primary thread.
//!
//! [`UnownedSerialExecutor`] and [`UnownedTaskExecutor`] are the lightweight
//! identity tokens used in place of strong handles.

mod core;
mod run_loop;
mod serial;
mod task;
mod unowned;

pub use self::core::Executor;
pub use run_loop::{EventHandler, EventableExecutor, ExecutorEvent, MainExecutor, RunLoopExecutor};
pub use serial::{SerialExecutor, is_installed_main_executor};
pub use task::TaskExecutor;
pub use unowned::{UnownedSerialExecutor, UnownedTaskExecutor};
