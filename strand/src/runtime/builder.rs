use super::Runtime;
use super::executor::core::DEFAULT_WORKER_NAME;
use crate::error::Result;
use crate::time::DEFAULT_TIMER_NAME;

/// Builder for configuring and creating a runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_name("io-worker")
///     .worker_stack_size(256 * 1024)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Name prefix of worker threads.
    worker_name: String,

    /// Stack size of worker threads, `None` for the platform default.
    worker_stack_size: Option<usize>,

    /// Name of the timer thread.
    timer_name: String,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            worker_name: DEFAULT_WORKER_NAME.to_owned(),
            worker_stack_size: None,
            timer_name: DEFAULT_TIMER_NAME.to_owned(),
        }
    }

    /// Sets the name prefix of worker threads.
    ///
    /// Workers are named `<prefix>-<id>`.
    pub fn worker_name(mut self, prefix: impl Into<String>) -> Self {
        self.worker_name = prefix.into();
        self
    }

    /// Sets the stack size of worker threads, in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn worker_stack_size(mut self, size: usize) -> Self {
        assert!(size > 0, "worker_stack_size must be > 0");

        self.worker_stack_size = Some(size);
        self
    }

    /// Sets the name of the timer thread.
    pub fn timer_name(mut self, name: impl Into<String>) -> Self {
        self.timer_name = name.into();
        self
    }

    /// Builds the runtime with the configured options.
    ///
    /// This starts the timer thread. Worker threads are spawned lazily.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`](crate::Error::Spawn) if the timer thread
    /// cannot be created.
    pub fn build(self) -> Result<Runtime> {
        Runtime::new(self.worker_name, self.worker_stack_size, self.timer_name)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
