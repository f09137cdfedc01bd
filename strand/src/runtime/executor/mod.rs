//! Elastic worker pool.
//!
//! It is composed of:
//! - [`core`]: the [`WorkerPool`](core::WorkerPool) handle, its idle set
//!   and the shutdown path,
//! - [`worker`]: worker threads that each run one task at a time.

pub(crate) mod core;
pub(crate) mod worker;
