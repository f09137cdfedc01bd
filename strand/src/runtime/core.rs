use super::executor::core::WorkerPool;
use crate::error::Result;
use crate::time::{TimerHandle, TimerPool};
use crate::tools::{RetryHandle, retry};

use std::time::Duration;

/// The main runtime handle.
///
/// `Runtime` owns one [`WorkerPool`] and one [`TimerPool`] dispatching into
/// it. It is responsible for:
/// - running fire-and-forget tasks,
/// - scheduling and cancelling timers,
/// - driving retry chains on top of the timers.
///
/// Dropping the runtime shuts both pools down in an orderly fashion.
pub struct Runtime {
    /// Pool running submitted tasks and fired timers.
    workers: WorkerPool,

    /// Timer thread dispatching into `workers`.
    timers: TimerPool,
}

impl Runtime {
    /// Creates a new runtime instance.
    ///
    /// The timer thread is started automatically.
    pub(crate) fn new(
        worker_name: String,
        worker_stack_size: Option<usize>,
        timer_name: String,
    ) -> Result<Self> {
        let workers = WorkerPool::with_settings(worker_name, worker_stack_size);
        let timers = TimerPool::start_named(&workers, timer_name)?;

        Ok(Self { workers, timers })
    }

    /// Runs `task` on a worker thread. See [`WorkerPool::submit`].
    pub fn submit_work<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.workers.submit(task)
    }

    /// Runs `callback` on a worker thread after `timeout`.
    /// See [`TimerPool::create_timer`].
    pub fn create_timer<F>(&self, callback: F, timeout: Duration) -> Result<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.timers.create_timer(callback, timeout)
    }

    /// Cancels a timer. See [`TimerPool::cancel_timer`].
    pub fn cancel_timer(&self, handle: &TimerHandle) {
        self.timers.cancel_timer(handle);
    }

    /// Invokes `operation` now, then again every `delay` until it cancels
    /// the chain through the handle it receives.
    ///
    /// After `max_attempts` re-invocations (`max_attempts + 1` calls in
    /// total) without cancellation, `on_exhausted` runs once and the chain
    /// stops.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// runtime.retry_operation(
    ///     |handle| {
    ///         if poll_ready() {
    ///             handle.cancel();
    ///         }
    ///     },
    ///     Duration::from_millis(50),
    ///     5,
    ///     || eprintln!("never became ready"),
    /// )?;
    /// ```
    pub fn retry_operation<Op, F>(
        &self,
        operation: Op,
        delay: Duration,
        max_attempts: usize,
        on_exhausted: F,
    ) -> Result<RetryHandle>
    where
        Op: FnMut(&RetryHandle) + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        retry(max_attempts, operation)
            .set_interval(delay)
            .on_exhausted(on_exhausted)
            .start(&self.timers)
    }

    /// The worker pool owned by this runtime.
    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// The timer pool owned by this runtime.
    pub fn timers(&self) -> &TimerPool {
        &self.timers
    }
}

impl Drop for Runtime {
    /// Shuts down the runtime.
    ///
    /// This performs the following steps:
    /// 1. Stops the timer thread, dropping timers that have not fired
    /// 2. Closes the worker pool and joins every worker thread
    fn drop(&mut self) {
        self.timers.shutdown();
        self.workers.shutdown();
    }
}
