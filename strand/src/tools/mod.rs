//! Retry utilities built on the timer pool.
//!
//! The main entry point is [`retry`], which builds a chain that
//! re-invokes an operation after a fixed delay until it cancels itself
//! or the retry budget runs out.

mod retry;

#[doc(inline)]
pub use retry::{Retry, RetryHandle, retry};
