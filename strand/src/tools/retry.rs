use crate::error::Result;
use crate::time::TimerPool;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

/// Callback invoked once when a retry chain runs out of attempts.
type Exhausted = Box<dyn FnOnce() + Send + 'static>;

/// Creates a retry chain that invokes `operation` up to `times + 1` times.
///
/// The chain only stops early when the operation (or anyone holding the
/// [`RetryHandle`]) cancels it. Success is signalled the same way: the
/// operation calls [`RetryHandle::cancel`] once it has what it needs.
///
/// # Examples
///
/// ```rust,ignore
/// retry(3, |handle: &RetryHandle| {
///     if try_connect().is_ok() {
///         handle.cancel();
///     }
/// })
/// .set_interval(Duration::from_millis(100))
/// .on_exhausted(|| eprintln!("giving up"))
/// .start(&timers)?;
/// ```
pub fn retry<Op>(times: usize, operation: Op) -> Retry<Op>
where
    Op: FnMut(&RetryHandle) + Send + 'static,
{
    Retry::new(times, operation)
}

/// Builder for a retry chain, returned by [`retry`].
pub struct Retry<Op> {
    operation: Op,
    remaining: usize,
    interval: Duration,
    on_exhausted: Option<Exhausted>,
}

impl<Op> Retry<Op>
where
    Op: FnMut(&RetryHandle) + Send + 'static,
{
    fn new(times: usize, operation: Op) -> Self {
        Self {
            operation,
            remaining: times,
            interval: Duration::ZERO,
            on_exhausted: None,
        }
    }

    /// Sets the delay between two invocations.
    pub fn set_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the callback run once all attempts have been used up.
    ///
    /// It is never run for a chain that was cancelled.
    pub fn on_exhausted<F>(mut self, on_exhausted: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_exhausted = Some(Box::new(on_exhausted));
        self
    }

    /// Starts the chain.
    ///
    /// The first invocation runs synchronously on the calling thread;
    /// later ones run on worker threads once their timer expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the second invocation cannot be scheduled
    /// because `timers` has been shut down.
    pub fn start(self, timers: &TimerPool) -> Result<RetryHandle> {
        let chain = Arc::new(RetryChain {
            state: Mutex::new(RetryState {
                operation: Some(self.operation),
                remaining: self.remaining,
                on_exhausted: self.on_exhausted,
            }),
            handle: RetryHandle::new(),
            interval: self.interval,
            timers: timers.clone(),
        });

        chain.attempt()?;
        Ok(chain.handle.clone())
    }
}

/// Cancels a retry chain.
///
/// The operation receives a reference to this handle on every invocation;
/// [`Retry::start`] returns a clone for external cancellation. Once
/// cancelled, the chain never invokes the operation again and never calls
/// its `on_exhausted` callback. An invocation that is already running is
/// not interrupted.
#[derive(Clone, Debug)]
pub struct RetryHandle {
    cancelled: Arc<AtomicBool>,
}

impl RetryHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops the chain. Cancelling more than once does nothing.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once the chain has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Mutable state of a chain. Only the thread running the current
/// invocation touches it.
struct RetryState<Op> {
    /// Taken out while it runs, so the lock is never held across it.
    operation: Option<Op>,

    /// Invocations left after the current one.
    remaining: usize,

    on_exhausted: Option<Exhausted>,
}

struct RetryChain<Op> {
    state: Mutex<RetryState<Op>>,
    handle: RetryHandle,
    interval: Duration,
    timers: TimerPool,
}

impl<Op> RetryChain<Op>
where
    Op: FnMut(&RetryHandle) + Send + 'static,
{
    /// Runs one invocation and schedules the next, or reports exhaustion.
    ///
    /// Cancellation is checked before and after the invocation and always
    /// wins over exhaustion.
    fn attempt(self: &Arc<Self>) -> Result<()> {
        if self.handle.is_cancelled() {
            trace!("retry chain cancelled before invocation");
            return Ok(());
        }

        let Some(mut operation) = self.lock().operation.take() else {
            return Ok(());
        };

        operation(&self.handle);

        let mut state = self.lock();
        state.operation = Some(operation);

        if self.handle.is_cancelled() {
            debug!(remaining = state.remaining, "retry chain cancelled");
            return Ok(());
        }

        if state.remaining > 0 {
            state.remaining -= 1;
            drop(state);

            let chain = self.clone();
            self.timers.create_timer(
                move || {
                    if let Err(error) = chain.attempt() {
                        debug!(%error, "retry chain stopped");
                    }
                },
                self.interval,
            )?;

            return Ok(());
        }

        let on_exhausted = state.on_exhausted.take();
        drop(state);

        debug!("retry attempts exhausted");

        if let Some(on_exhausted) = on_exhausted {
            on_exhausted();
        }

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, RetryState<Op>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
