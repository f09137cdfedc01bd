//! # Strand
//!
//! **Strand** is a small thread-based scheduling runtime for event-driven
//! programs that need timers and background work without an async runtime.
//!
//! It provides:
//!
//! - An **elastic worker pool** that hands each task to an idle thread or
//!   spawns a new one, so tasks never queue behind each other
//! - A **timer thread** that sleeps until the nearest deadline, coalesces
//!   timers sharing a deadline, and supports cancellation
//! - A **retry combinator** re-invoking an operation on a fixed delay until
//!   it cancels itself or its budget runs out
//! - A single-slot [`Event`](sync::Event) for cross-thread signalling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strand::RuntimeBuilder;
//! use strand::sync::Event;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let runtime = RuntimeBuilder::new().build()?;
//! let done = Arc::new(Event::new());
//!
//! let signal = done.clone();
//! runtime.create_timer(move || signal.signal(), Duration::from_millis(100))?;
//!
//! done.wait();
//! ```
//!
//! ## Modules
//!
//! - [`time`] — Timer pool and timer handles
//! - [`sync`] — Cross-thread signalling
//! - [`tools`] — Retry chains

mod error;
mod runtime;

pub mod sync;
pub mod time;
pub mod tools;

pub use error::{Error, Result};
pub use runtime::builder::RuntimeBuilder;
pub use runtime::{Runtime, WorkerPool};
pub use time::{TimerHandle, TimerPool};
