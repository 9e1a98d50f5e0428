//! Thread pool task executor.
//!
//! It is composed of:
//! - [`core`]: the pool handle, its shared state and lifecycle management,
//! - [`worker`]: worker threads that run jobs using work-stealing.

pub(crate) mod core;
pub(crate) mod worker;
