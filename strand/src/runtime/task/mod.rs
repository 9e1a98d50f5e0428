//! Asynchronous tasks on top of executors.
//!
//! A task wraps a future and turns every step of it into a [`Job`]. Jobs are
//! routed by the task's isolation and executor preference:
//! - isolated tasks ([`spawn_isolated`], [`spawn_on_main`]) run every step on
//!   their serial executor,
//! - nonisolated tasks run on their preferred task executor, or on the
//!   process-wide default executor without one.
//!
//! Preferences are explicit: [`spawn_with_executor`] and
//! [`with_task_executor_preference`] set one, [`spawn_child`] inherits the
//! caller's, and unstructured [`spawn`] never does.
//!
//! [`Job`]: crate::job::Job

mod builder;
mod core;
mod handle;
mod scope;
mod state;
mod waker;

pub use builder::{Builder, spawn, spawn_child, spawn_isolated, spawn_on_main, spawn_with_executor};
pub use handle::{JoinError, JoinHandle};
pub use scope::{CurrentExecutor, block_on, current_executor, with_task_executor_preference};
