use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Callback run on a worker thread when a timer fires.
pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A scheduled timer stored in the [`TimerSet`](super::set::TimerSet).
///
/// The event only records when it is due and whether it was cancelled.
/// Its remaining time is the key of the set entry it lives in.
pub(crate) struct TimerEvent {
    /// Callback to submit to the worker pool.
    pub(crate) callback: Callback,

    /// The exact instant the timer becomes due.
    pub(crate) deadline: Instant,

    /// Cancellation flag shared with the caller's [`TimerHandle`].
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl TimerEvent {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle to a scheduled timer.
///
/// The handle shares one cancellation flag with the scheduled event. It is
/// written only by [`TimerPool::cancel_timer`](super::TimerPool::cancel_timer)
/// and read by the timer thread right before dispatch.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    pub(crate) cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns `true` once the timer has been cancelled.
    ///
    /// A cancelled timer may still have run if it was dispatched before
    /// the cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
