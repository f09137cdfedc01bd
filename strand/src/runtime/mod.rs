//! Core runtime components.
//!
//! This module contains the worker pool and the [`Runtime`] context object
//! that ties it to a timer pool.
//!
//! It is responsible for:
//! - spawning worker threads on demand,
//! - handing tasks to idle workers,
//! - shutting pools down and joining their threads.

mod core;
mod executor;

pub(crate) mod builder;

pub use self::core::Runtime;
pub use executor::core::WorkerPool;
