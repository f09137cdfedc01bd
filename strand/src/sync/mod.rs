//! Synchronization primitives.
//!
//! The current primitives include:
//! - [`Event`] — a single-slot signal consumed by the waiter that observes it.
//!
//! Events are safe to share between threads using `Arc`.

mod event;

pub use event::Event;
