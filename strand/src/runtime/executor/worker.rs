use super::core::Shared;

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{trace, warn};

/// A unit of work submitted to the pool.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// The single task slot of a worker, guarded by the worker's own lock.
struct Slot {
    /// Task assigned by the pool and not yet picked up.
    task: Option<Task>,

    /// Set when the pool shuts down while this worker is idle.
    closed: bool,
}

/// A worker thread of the pool.
///
/// A `Worker` runs at most one task at a time. It is owned by its own
/// thread; the pool only ever keeps a [`Weak`](std::sync::Weak) reference
/// to it in the idle set.
///
/// The execution loop is:
/// 1. Take the assigned task, or block on the private condition variable
/// 2. Run it
/// 3. Register as idle again, or exit if the pool is closed
pub(crate) struct Worker {
    /// Unique identifier of the worker.
    id: usize,

    slot: Mutex<Slot>,

    /// Wakes the worker when a task is assigned or the pool closes.
    condvar: Condvar,
}

impl Worker {
    /// Creates a worker whose slot already holds its first task.
    pub(crate) fn new(id: usize, task: Task) -> Self {
        Self {
            id,
            slot: Mutex::new(Slot {
                task: Some(task),
                closed: false,
            }),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Hands a task to this worker and wakes it.
    ///
    /// The caller must have removed the worker from the idle set first,
    /// so the slot is guaranteed to be empty.
    pub(crate) fn assign(&self, task: Task) {
        let mut slot = self.lock();
        debug_assert!(slot.task.is_none(), "idle worker already had a task");
        slot.task = Some(task);
        self.condvar.notify_one();
    }

    /// Asks an idle worker to exit.
    pub(crate) fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        self.condvar.notify_one();
    }

    /// Runs the worker loop until the pool shuts down.
    ///
    /// A panic inside a task unwinds this thread and ends the worker;
    /// the pool keeps running with one fewer thread.
    pub(crate) fn run(self: Arc<Self>, pool: Arc<Shared>) {
        let _exit = ExitGuard { id: self.id };

        while let Some(task) = self.next_task() {
            task();

            if !pool.release(&self) {
                break;
            }
        }
    }

    /// Blocks until a task is assigned, or returns `None` once closed.
    fn next_task(&self) -> Option<Task> {
        let mut slot = self.lock();

        loop {
            if let Some(task) = slot.task.take() {
                return Some(task);
            }

            if slot.closed {
                return None;
            }

            slot = self
                .condvar
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reports how a worker thread ended.
struct ExitGuard {
    id: usize,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(worker = self.id, "task panicked, worker thread terminated");
        } else {
            trace!(worker = self.id, "worker exited");
        }
    }
}
