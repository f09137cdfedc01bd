use super::worker::{Task, Worker};
use crate::error::{Error, Result};

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

/// Default name prefix of worker threads.
pub(crate) const DEFAULT_WORKER_NAME: &str = "strand-worker";

/// Idle workers, guarded by a single lock.
struct IdleSet {
    /// Workers waiting for a task. Never contains a busy worker.
    workers: VecDeque<Weak<Worker>>,

    /// Once set, no worker registers as idle and no task is accepted.
    shutdown: bool,
}

/// State shared between pool handles and worker threads.
pub(crate) struct Shared {
    idle: Mutex<IdleSet>,

    /// Join handles for every worker thread spawned so far.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Number of worker threads spawned so far.
    spawned: AtomicUsize,

    /// Name prefix for worker threads.
    name: String,

    /// Stack size for worker threads, `None` for the platform default.
    stack_size: Option<usize>,
}

impl Shared {
    /// Puts a worker back into the idle set after it finished a task.
    ///
    /// Returns `false` if the pool is shutting down, in which case the
    /// worker must exit.
    pub(crate) fn release(&self, worker: &Arc<Worker>) -> bool {
        let mut idle = self.lock_idle();

        if idle.shutdown {
            return false;
        }

        idle.workers.push_back(Arc::downgrade(worker));
        true
    }

    fn lock_idle(&self) -> MutexGuard<'_, IdleSet> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An elastic pool of worker threads.
///
/// Submitted tasks go to an idle worker when one exists; otherwise a new
/// worker thread is spawned for the task right away. Workers are never
/// retired while the pool is running, so the pool grows to the peak number
/// of concurrently running tasks.
///
/// `WorkerPool` is a cheap handle: clones refer to the same pool.
///
/// # Examples
///
/// ```rust,ignore
/// let pool = WorkerPool::new();
/// pool.submit(|| println!("hello from a worker"))?;
/// pool.shutdown();
/// ```
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Creates an empty pool with default thread settings.
    ///
    /// No thread is spawned until the first task is submitted.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_WORKER_NAME.to_owned(), None)
    }

    pub(crate) fn with_settings(name: String, stack_size: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(IdleSet {
                    workers: VecDeque::new(),
                    shutdown: false,
                }),
                handles: Mutex::new(Vec::new()),
                spawned: AtomicUsize::new(0),
                name,
                stack_size,
            }),
        }
    }

    /// Runs `task` on a worker thread.
    ///
    /// This is fire-and-forget: there is no completion handle. Tasks are
    /// not ordered relative to each other.
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`] if the pool has been shut down
    /// - [`Error::Spawn`] if a new worker was needed and the OS refused
    ///   to create the thread
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        let mut idle = self.shared.lock_idle();

        if idle.shutdown {
            return Err(Error::Shutdown);
        }

        while let Some(worker) = idle.workers.pop_front() {
            if let Some(worker) = worker.upgrade() {
                drop(idle);

                trace!(worker = worker.id(), "dispatching task to idle worker");
                worker.assign(task);
                return Ok(());
            }
        }

        // Spawning while the idle lock is held keeps `shutdown` from
        // missing the new join handle.
        self.spawn(task)
    }

    /// Number of worker threads spawned since the pool was created.
    pub fn workers(&self) -> usize {
        self.shared.spawned.load(Ordering::Acquire)
    }

    /// Number of workers currently waiting for a task.
    pub fn idle(&self) -> usize {
        self.shared.lock_idle().workers.len()
    }

    /// Shuts the pool down and joins its worker threads.
    ///
    /// Idle workers exit immediately, busy workers exit once their
    /// current task returns. A task that never returns keeps this call
    /// blocked. Calling it from inside a task skips joining the calling
    /// worker.
    ///
    /// Calling `shutdown` more than once is a no-op.
    pub fn shutdown(&self) {
        let idle = {
            let mut idle = self.shared.lock_idle();
            idle.shutdown = true;
            mem::take(&mut idle.workers)
        };

        for worker in idle.iter().filter_map(Weak::upgrade) {
            worker.close();
        }

        let handles = mem::take(&mut *self.shared.lock_handles());
        let current = thread::current().id();

        debug!(workers = handles.len(), "shutting down worker pool");

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }

            let name = handle.thread().name().map(str::to_owned);

            if handle.join().is_err() {
                warn!(thread = ?name, "worker thread ended with a panic");
            }
        }
    }

    /// Spawns a new worker thread running `task` first.
    ///
    /// The id is allocated, and the count bumped, under the handles lock,
    /// so ids stay unique even without the idle lock.
    fn spawn(&self, task: Task) -> Result<()> {
        let mut handles = self.shared.lock_handles();

        let id = self.shared.spawned.load(Ordering::Acquire);
        let worker = Arc::new(Worker::new(id, task));
        let pool = self.shared.clone();

        let mut builder = thread::Builder::new().name(format!("{}-{}", self.shared.name, id));
        if let Some(size) = self.shared.stack_size {
            builder = builder.stack_size(size);
        }

        let handle = builder.spawn(move || worker.run(pool))?;

        self.shared.spawned.store(id + 1, Ordering::Release);
        handles.push(handle);
        drop(handles);

        debug!(worker = id, "spawned worker thread");
        Ok(())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
