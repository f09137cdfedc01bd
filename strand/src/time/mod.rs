//! Timers backed by a single background thread.
//!
//! This module provides:
//! - [`TimerPool`]: the timer thread and its coalescing timer set,
//! - [`TimerHandle`]: the cancellation handle returned for each timer.
//!
//! Fired callbacks are handed to a [`WorkerPool`](crate::WorkerPool); the
//! timer thread itself never runs user code.

mod core;
mod entry;
mod set;

pub use self::core::TimerPool;
pub use entry::TimerHandle;

pub(crate) use self::core::DEFAULT_TIMER_NAME;
