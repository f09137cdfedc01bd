use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A single-slot signal for cross-thread synchronization.
///
/// [`signal`](Self::signal) raises the flag and wakes every waiter.
/// [`wait`](Self::wait) blocks until the flag is raised, then lowers it
/// again before returning, so each signal is consumed by one wait.
///
/// All waiters are woken by a signal but only the first to observe the
/// flag consumes it; the others go back to sleep. The type is meant for
/// a single waiter.
///
/// # Examples
///
/// ```rust,ignore
/// let done = Arc::new(Event::new());
///
/// let signal = done.clone();
/// pool.submit(move || signal.signal())?;
///
/// done.wait();
/// ```
#[derive(Debug, Default)]
pub struct Event {
    triggered: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    /// Creates an event in the non-signalled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag and wakes all waiters.
    ///
    /// Signalling an already signalled event does nothing more; signals
    /// do not accumulate.
    pub fn signal(&self) {
        let mut triggered = self.lock();
        *triggered = true;
        self.condvar.notify_all();
    }

    /// Blocks until the event is signalled, then consumes the signal.
    ///
    /// Returns immediately if an unconsumed signal is pending.
    pub fn wait(&self) {
        let mut triggered = self.lock();

        while !*triggered {
            triggered = self
                .condvar
                .wait(triggered)
                .unwrap_or_else(PoisonError::into_inner);
        }

        *triggered = false;
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Returns `true` if a signal was consumed, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self.lock();

        while !*triggered {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            triggered = match self.condvar.wait_timeout(triggered, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        *triggered = false;
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.triggered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
