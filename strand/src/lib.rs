//! # Strand
//!
//! **Strand** is an actor-isolation executor layer: the contracts and the
//! routing that make "at most one job of this domain runs at a time" a
//! property the runtime can check, plus executors that honor it.
//!
//! The crate is organized around a small capability hierarchy:
//!
//! - [`Executor`] accepts [`Job`]s, optionally with a delay against a
//!   [`Clock`](time::Clock)
//! - [`SerialExecutor`] is an executor that is also an isolation domain and
//!   can prove (or fatally fail to prove) that the caller runs on it
//! - [`TaskExecutor`] is a routing preference for nonisolated work
//! - [`MainExecutor`] is a run loop bound to the primary thread with
//!   coalesced event wake-ups
//!
//! Executors are compared through non-owning [`UnownedSerialExecutor`] and
//! [`UnownedTaskExecutor`] handles. The process-wide main and default
//! executors live in a write-once [`registry`]. Contract violations never
//! surface as values: they end the process through [`error::fatal`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strand::{Isolated, task};
//!
//! let counter = Isolated::new("counter", 0u64);
//!
//! for _ in 0..10 {
//!     counter.enqueue(|count| *count += 1);
//! }
//!
//! let total = task::block_on({
//!     let counter = counter.clone();
//!     async move { counter.spawn(|count| *count).await }
//! });
//! assert_eq!(total, Ok(10));
//! ```
//!
//! ## Modules
//!
//! - [`executor`]: Capability traits and unowned executor handles
//! - [`dispatch`]: Routing and isolation checks
//! - [`registry`]: Process-wide main and default executors
//! - [`task`]: Futures as routed jobs
//! - [`time`]: Clocks, delays and sleep

mod actor;
mod runtime;
mod utils;

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod job;
pub mod registry;
pub mod time;

pub use actor::Isolated;
pub use error::{ContractViolation, fatal};
pub use executor::{
    EventHandler, EventableExecutor, Executor, ExecutorEvent, MainExecutor, RunLoopExecutor,
    SerialExecutor, TaskExecutor, UnownedSerialExecutor, UnownedTaskExecutor,
    is_installed_main_executor,
};
pub use job::{Job, JobId, JobPriority, TaskId};
pub use runtime::task;
pub use runtime::yield_now::yield_now;
pub use runtime::{
    RunLoop, SerialQueue, ThreadPoolBuilder, ThreadPoolExecutor, is_main_thread,
};
