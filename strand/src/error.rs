//! Error types returned by the runtime.

use std::io;

use thiserror::Error;

/// Errors surfaced by the worker pool and the timer pool.
///
/// Retry exhaustion is not an error: it is reported through the
/// `on_exhausted` callback of a retry chain. Cancelling a timer twice, or
/// after it already fired, is a no-op and never produces an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The operating system refused to spawn a new thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),

    /// The pool has been shut down and no longer accepts work.
    #[error("pool has been shut down")]
    Shutdown,
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
