//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the runtime.
//! In particular, it exposes a generational [`Slab`] used for indexed storage
//! whose keys are never reused.

mod slab;

pub(crate) use slab::Slab;
