//! Work-stealing queues backing the thread pool executor.
//!
//! It consists of:
//! - [`injector`]: the global queue jobs from outside the pool land in,
//! - [`queue`]: per-worker local queues that other workers steal from.

pub(crate) mod injector;
pub(crate) mod queue;
