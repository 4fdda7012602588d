//! # Job Scheduling
//!
//! Handle-addressed task pool and the worker-backed job system.
//!
//! The [`pool`] module owns slot allocation, generation-stamped handles,
//! and the parent/continuation finish protocol; the [`system`] module adds
//! the worker threads, the blocking ready queue, and the work-borrowing
//! waiting discipline.

pub mod pool;
pub mod system;
