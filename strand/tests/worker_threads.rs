mod common;

use common::{init_tracing, wait_until};
use strand::{Error, RuntimeBuilder, WorkerPool};

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_submit_runs_task() {
    init_tracing();
    let pool = WorkerPool::new();
    let (transmitter, receiver) = mpsc::channel();

    pool.submit(move || transmitter.send(42).unwrap()).unwrap();

    assert_eq!(receiver.recv_timeout(RECV_TIMEOUT).unwrap(), 42);
    assert_eq!(pool.workers(), 1);

    pool.shutdown();
}

#[test]
fn test_concurrent_submits_spawn_one_worker_each() {
    init_tracing();
    const TASKS: usize = 8;

    let pool = WorkerPool::new();
    let barrier = Arc::new(Barrier::new(TASKS));
    let runs: Arc<Vec<AtomicUsize>> = Arc::new((0..TASKS).map(|_| AtomicUsize::new(0)).collect());
    let threads = Arc::new(Mutex::new(HashSet::new()));
    let (transmitter, receiver) = mpsc::channel();

    for i in 0..TASKS {
        let barrier = barrier.clone();
        let runs = runs.clone();
        let threads = threads.clone();
        let transmitter = transmitter.clone();

        pool.submit(move || {
            runs[i].fetch_add(1, Ordering::SeqCst);
            threads.lock().unwrap().insert(thread::current().id());
            // Every task must be running at once for the barrier to open.
            barrier.wait();
            transmitter.send(i).unwrap();
        })
        .unwrap();
    }

    let mut done: Vec<usize> = (0..TASKS)
        .map(|_| receiver.recv_timeout(RECV_TIMEOUT).unwrap())
        .collect();
    done.sort_unstable();

    assert_eq!(done, (0..TASKS).collect::<Vec<_>>());
    assert_eq!(pool.workers(), TASKS);
    assert_eq!(threads.lock().unwrap().len(), TASKS);
    for (i, count) in runs.iter().enumerate() {
        assert_eq!(count.load(Ordering::SeqCst), 1, "Task {} should run exactly once", i);
    }

    pool.shutdown();
}

#[test]
fn test_submits_from_many_threads_get_distinct_workers() {
    init_tracing();
    const SUBMITTERS: usize = 6;

    let pool = WorkerPool::new();
    let start = Arc::new(Barrier::new(SUBMITTERS));
    let running = Arc::new(Barrier::new(SUBMITTERS));
    let (transmitter, receiver) = mpsc::channel();

    let submitters: Vec<_> = (0..SUBMITTERS)
        .map(|_| {
            let pool = pool.clone();
            let start = start.clone();
            let running = running.clone();
            let transmitter = transmitter.clone();

            thread::spawn(move || {
                start.wait();
                pool.submit(move || {
                    let name = thread::current().name().map(str::to_owned);
                    // Keeps every worker busy until all tasks are running.
                    running.wait();
                    transmitter.send(name).unwrap();
                })
                .unwrap();
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    let names: HashSet<String> = (0..SUBMITTERS)
        .map(|_| receiver.recv_timeout(RECV_TIMEOUT).unwrap().unwrap())
        .collect();

    let expected: HashSet<String> = (0..SUBMITTERS)
        .map(|id| format!("strand-worker-{}", id))
        .collect();

    assert_eq!(names, expected);
    assert_eq!(pool.workers(), SUBMITTERS);

    pool.shutdown();
}

#[test]
fn test_idle_worker_is_reused() {
    init_tracing();
    let pool = WorkerPool::new();
    let (transmitter, receiver) = mpsc::channel();

    let first = transmitter.clone();
    pool.submit(move || first.send(thread::current().id()).unwrap())
        .unwrap();
    let first_thread = receiver.recv_timeout(RECV_TIMEOUT).unwrap();

    assert!(
        wait_until(RECV_TIMEOUT, || pool.idle() == 1),
        "Worker should register as idle after its task"
    );

    pool.submit(move || transmitter.send(thread::current().id()).unwrap())
        .unwrap();
    let second_thread = receiver.recv_timeout(RECV_TIMEOUT).unwrap();

    assert_eq!(first_thread, second_thread);
    assert_eq!(pool.workers(), 1);

    pool.shutdown();
}

#[test]
fn test_busy_worker_is_not_idle() {
    init_tracing();
    let pool = WorkerPool::new();
    let (release, blocked) = mpsc::channel::<()>();
    let (started, receiver) = mpsc::channel();

    pool.submit(move || {
        started.send(()).unwrap();
        let _ = blocked.recv();
    })
    .unwrap();

    receiver.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(pool.idle(), 0);

    release.send(()).unwrap();
    assert!(wait_until(RECV_TIMEOUT, || pool.idle() == 1));

    pool.shutdown();
}

#[test]
fn test_panicking_task_only_ends_its_worker() {
    init_tracing();
    let pool = WorkerPool::new();
    let (transmitter, receiver) = mpsc::channel();

    pool.submit(|| panic!("task failure")).unwrap();

    pool.submit(move || transmitter.send("still running").unwrap())
        .unwrap();

    assert_eq!(receiver.recv_timeout(RECV_TIMEOUT).unwrap(), "still running");
    assert_eq!(pool.workers(), 2);

    // The panicked worker never becomes idle again.
    assert!(wait_until(RECV_TIMEOUT, || pool.idle() == 1));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(pool.idle(), 1);

    pool.shutdown();
}

#[test]
fn test_submit_after_shutdown_fails() {
    init_tracing();
    let pool = WorkerPool::new();
    pool.shutdown();

    let result = pool.submit(|| {});
    assert!(matches!(result, Err(Error::Shutdown)));
    assert_eq!(pool.workers(), 0);
}

#[test]
fn test_shutdown_waits_for_running_task() {
    init_tracing();
    let pool = WorkerPool::new();
    let finished = Arc::new(AtomicBool::new(false));
    let (started, receiver) = mpsc::channel();

    let flag = finished.clone();
    pool.submit(move || {
        started.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();

    receiver.recv_timeout(RECV_TIMEOUT).unwrap();
    pool.shutdown();

    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(pool.idle(), 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    init_tracing();
    let pool = WorkerPool::new();
    pool.submit(|| {}).unwrap();

    pool.shutdown();
    pool.shutdown();

    assert!(matches!(pool.submit(|| {}), Err(Error::Shutdown)));
}

#[test]
fn test_shutdown_from_inside_a_task() {
    init_tracing();
    let pool = WorkerPool::new();
    let (transmitter, receiver) = mpsc::channel();

    let inner = pool.clone();
    pool.submit(move || {
        inner.shutdown();
        transmitter.send(()).unwrap();
    })
    .unwrap();

    receiver.recv_timeout(RECV_TIMEOUT).unwrap();
    assert!(matches!(pool.submit(|| {}), Err(Error::Shutdown)));
}

#[test]
fn test_worker_threads_are_named() {
    init_tracing();
    let runtime = RuntimeBuilder::new().worker_name("custom").build().unwrap();
    let (transmitter, receiver) = mpsc::channel();

    runtime
        .submit_work(move || {
            let name = thread::current().name().map(str::to_owned);
            transmitter.send(name).unwrap();
        })
        .unwrap();

    let name = receiver.recv_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(name.as_deref(), Some("custom-0"));
}

#[test]
fn test_worker_stack_size() {
    init_tracing();
    let runtime = RuntimeBuilder::new()
        .worker_stack_size(512 * 1024)
        .build()
        .unwrap();
    let (transmitter, receiver) = mpsc::channel();

    runtime
        .submit_work(move || transmitter.send(()).unwrap())
        .unwrap();

    receiver.recv_timeout(RECV_TIMEOUT).unwrap();
}

#[test]
#[should_panic(expected = "worker_stack_size must be > 0")]
fn test_worker_stack_size_zero_panics() {
    let _ = RuntimeBuilder::new().worker_stack_size(0);
}
