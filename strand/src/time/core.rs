use super::entry::{Callback, TimerEvent, TimerHandle};
use super::set::{Chain, TimerSet, chain_deadline};
use crate::error::{Error, Result};
use crate::runtime::WorkerPool;

use std::mem;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

/// Default name of the timer thread.
pub(crate) const DEFAULT_TIMER_NAME: &str = "strand-timer";

/// Timeouts are capped so that deadlines never overflow [`Instant`].
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Timer state, guarded by the pool lock.
struct State {
    /// Pending events, keyed by milliseconds remaining from `origin`.
    set: TimerSet,

    /// Reference instant all keys are measured from.
    origin: Instant,

    /// Number of events taken out of the set by the sleeping timer thread.
    in_flight: usize,

    shutdown: bool,
}

impl State {
    /// Inserts an event due `timeout` after `now` and returns its key.
    ///
    /// `origin` moves to `now` only while nothing is pending, so every
    /// event created back-to-back with the same timeout gets the same key.
    fn schedule(
        &mut self,
        now: Instant,
        timeout: Duration,
        callback: Callback,
        cancelled: Arc<AtomicBool>,
    ) -> u64 {
        if self.set.is_empty() && self.in_flight == 0 {
            self.origin = now;
        }

        let deadline = now + timeout.min(MAX_TIMEOUT);
        let key = millis(deadline.saturating_duration_since(self.origin));

        self.set.insert(
            key,
            TimerEvent {
                callback,
                deadline,
                cancelled,
            },
        );

        key
    }
}

struct Shared {
    state: Mutex<State>,

    /// Wakes the timer thread on insertion, cancellation and shutdown.
    condvar: Condvar,

    /// Pool that runs fired callbacks.
    workers: WorkerPool,

    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The timer thread loop.
    ///
    /// Each pass takes the earliest chain out of the set and sleeps until
    /// its deadline. On expiry the chain is dispatched to the worker pool;
    /// on an early wake it goes back into the set and every key is reduced
    /// by the time that has passed.
    fn run(&self) {
        let mut state = self.lock();

        loop {
            if state.shutdown {
                break;
            }

            let Some((key, chain)) = state.set.pop_first() else {
                state = self
                    .condvar
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let Some(deadline) = chain_deadline(&chain) else {
                continue;
            };

            state.in_flight = chain.len();

            let timeout = deadline.saturating_duration_since(Instant::now());
            state = match self.condvar.wait_timeout(state, timeout) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };

            state.in_flight = 0;

            if state.shutdown {
                state.set.insert_chain(key, chain);
                break;
            }

            let now = Instant::now();

            if now >= deadline {
                state.set.advance(key);
                state.origin += Duration::from_millis(key);
                drop(state);

                self.dispatch(key, chain);
                state = self.lock();
            } else {
                state.set.insert_chain(key, chain);

                let elapsed = millis(now.saturating_duration_since(state.origin));
                state.set.advance(elapsed);
                state.origin += Duration::from_millis(elapsed);
            }
        }

        let pending = mem::take(&mut state.set);
        drop(state);

        debug!(dropped = pending.events(), "timer thread stopped");
    }

    /// Submits every non-cancelled event of an expired chain.
    fn dispatch(&self, key: u64, chain: Chain) {
        trace!(key, events = chain.len(), "timer chain expired");

        for event in chain {
            if event.is_cancelled() {
                trace!("skipping cancelled timer");
                continue;
            }

            if let Err(error) = self.workers.submit(event.callback) {
                warn!(%error, "dropping expired timer callback");
            }
        }
    }
}

/// A timer service driven by one dedicated background thread.
///
/// Timers whose remaining time falls into the same millisecond share a
/// single entry and are fired together after one sleep. Fired callbacks
/// run on the [`WorkerPool`] given at start-up, never on the timer thread.
///
/// `TimerPool` is a cheap handle: clones refer to the same thread.
///
/// # Examples
///
/// ```rust,ignore
/// let workers = WorkerPool::new();
/// let timers = TimerPool::start(&workers)?;
///
/// let handle = timers.create_timer(|| println!("fired"), Duration::from_millis(50))?;
/// timers.cancel_timer(&handle);
/// ```
#[derive(Clone)]
pub struct TimerPool {
    shared: Arc<Shared>,
}

impl TimerPool {
    /// Starts the timer thread, dispatching fired callbacks to `workers`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the thread cannot be created.
    pub fn start(workers: &WorkerPool) -> Result<Self> {
        Self::start_named(workers, DEFAULT_TIMER_NAME.to_owned())
    }

    pub(crate) fn start_named(workers: &WorkerPool, name: String) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                set: TimerSet::new(),
                origin: Instant::now(),
                in_flight: 0,
                shutdown: false,
            }),
            condvar: Condvar::new(),
            workers: workers.clone(),
            thread: Mutex::new(None),
        });

        let timer = shared.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || timer.run())?;

        *shared.thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(Self { shared })
    }

    /// Schedules `callback` to run on a worker thread once `timeout` has
    /// elapsed.
    ///
    /// A zero timeout fires on the timer thread's next pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if the pool has been shut down.
    pub fn create_timer<F>(&self, callback: F, timeout: Duration) -> Result<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = TimerHandle::new();
        let mut state = self.shared.lock();

        if state.shutdown {
            return Err(Error::Shutdown);
        }

        let key = state.schedule(
            Instant::now(),
            timeout,
            Box::new(callback),
            handle.cancelled.clone(),
        );
        drop(state);

        self.shared.condvar.notify_one();

        trace!(key, ?timeout, "timer scheduled");
        Ok(handle)
    }

    /// Cancels a timer.
    ///
    /// The callback will not be dispatched unless it already was.
    /// Cancellation is checked when the timer expires; it never interrupts
    /// a callback that is already running. Cancelling twice, or after the
    /// timer fired, does nothing.
    pub fn cancel_timer(&self, handle: &TimerHandle) {
        handle.cancel();
        self.shared.condvar.notify_one();
    }

    /// Number of scheduled events not yet expired, cancelled ones included.
    pub fn pending(&self) -> usize {
        let state = self.shared.lock();
        state.set.events() + state.in_flight
    }

    /// Stops the timer thread and waits for it to exit.
    ///
    /// Timers that have not expired yet are dropped without running.
    /// Calling `shutdown` more than once is a no-op.
    pub fn shutdown(&self) {
        self.shared.lock().shutdown = true;
        self.shared.condvar.notify_all();

        let handle = self
            .shared
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }

            if handle.join().is_err() {
                warn!("timer thread ended with a panic");
            }
        }
    }
}

/// Whole milliseconds in `duration`, rounded down.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
