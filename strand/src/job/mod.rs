//! Schedulable units of work.
//!
//! A [`Job`] is what executors accept. It carries an identity, a priority and
//! a payload that runs exactly once. The payload itself is opaque to the
//! executor layer.

mod core;
mod priority;

pub use self::core::{Job, JobId, TaskId};
pub use priority::JobPriority;
