mod common;

use common::{TIMEOUT, collect, expect_fatal, signal};
use strand::dispatch::is_on_executor;
use strand::{Executor, Isolated, Job, JobPriority, RunLoop, RunLoopExecutor, SerialQueue, task};
use strand::{ThreadPoolBuilder, ThreadPoolExecutor};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

fn job(work: impl FnOnce() + Send + 'static) -> Job {
    Job::new(JobPriority::MEDIUM, work)
}

fn pool(threads: usize) -> Arc<ThreadPoolExecutor> {
    Arc::new(ThreadPoolBuilder::new().worker_threads(threads).build())
}

/// Holds submitted jobs until the test runs them.
#[derive(Default)]
struct Parked {
    jobs: Mutex<Vec<Job>>,
}

impl Executor for Parked {
    fn enqueue(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }
}

/// Drops submitted jobs until it is opened, then holds them.
#[derive(Default)]
struct Gate {
    open: AtomicBool,
    jobs: Mutex<Vec<Job>>,
}

impl Executor for Gate {
    fn enqueue(&self, job: Job) {
        if self.open.load(Ordering::SeqCst) {
            self.jobs.lock().unwrap().push(job);
        }
    }
}

/// Counts how many of the jobs holding it were dropped without running.
struct Unrun(Arc<AtomicUsize>);

impl Drop for Unrun {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_jobs_never_overlap() {
    let queue = SerialQueue::with_target("exclusive", pool(4));
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let submitters: Vec<_> = (0..2)
        .map(|_| {
            let queue = queue.clone();
            let inside = inside.clone();
            let overlaps = overlaps.clone();
            let sender = sender.clone();

            thread::spawn(move || {
                for _ in 0..200 {
                    let inside = inside.clone();
                    let overlaps = overlaps.clone();
                    let sender = sender.clone();

                    queue.enqueue(job(move || {
                        if inside.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }

                        thread::yield_now();
                        inside.store(false, Ordering::SeqCst);
                        let _ = sender.send(());
                    }));
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    collect(&receiver, 400, TIMEOUT);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_jobs_run_in_fifo_order() {
    let queue = SerialQueue::with_target("fifo", pool(4));
    let (sender, receiver) = mpsc::channel();

    for i in 0..100 {
        queue.enqueue(signal(&sender, i));
    }

    assert_eq!(collect(&receiver, 100, TIMEOUT), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_at_most_one_drain_is_outstanding() {
    let target = Arc::new(Parked::default());
    let queue = SerialQueue::with_target("parked", target.clone());
    let ran = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let ran = ran.clone();
        queue.enqueue(job(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert_eq!(queue.pending_jobs(), 3);

    let drains: Vec<Job> = target.jobs.lock().unwrap().drain(..).collect();
    assert_eq!(drains.len(), 1);

    for drain in drains {
        drain.run();
    }

    assert_eq!(ran.load(Ordering::SeqCst), 3);
    assert_eq!(queue.pending_jobs(), 0);

    // The queue is idle again, so the next job submits a fresh drain.
    queue.enqueue(job(|| {}));
    assert_eq!(target.jobs.lock().unwrap().len(), 1);
}

#[test]
fn test_panicking_job_does_not_wedge_the_queue() {
    let queue = SerialQueue::with_target("panics", pool(2));
    let (sender, receiver) = mpsc::channel();

    queue.enqueue(job(|| panic!("job failure")));
    queue.enqueue(signal(&sender, "after"));

    assert_eq!(collect(&receiver, 1, TIMEOUT), vec!["after"]);
}

#[test]
fn test_queue_drains_on_a_run_loop() {
    let run_loop = Arc::new(RunLoop::with_label("queue-target"));
    let queue = SerialQueue::with_target("on-loop", run_loop.clone());
    let (sender, receiver) = mpsc::channel();
    let seen = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let probe = queue.clone();
        let target = run_loop.clone();
        let sender = sender.clone();
        let seen = seen.clone();

        queue.enqueue(job(move || {
            let _ = sender.send((is_on_executor(&probe), is_on_executor(&*target)));
            seen.fetch_add(1, Ordering::SeqCst);
        }));
    }

    run_loop.run_until(&mut || seen.load(Ordering::SeqCst) == 3);

    assert_eq!(collect(&receiver, 3, TIMEOUT), vec![(true, true); 3]);
    assert!(!is_on_executor(&queue));
}

#[test]
fn test_isolated_state_from_many_threads() {
    let counter = Isolated::with_queue(SerialQueue::with_target("counter", pool(4)), 0u64);

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let counter = counter.clone();

            thread::spawn(move || {
                for _ in 0..500 {
                    counter.enqueue(|count| *count += 1);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    let total = task::block_on({
        let counter = counter.clone();
        async move { counter.spawn(|count| *count).await }
    });

    assert_eq!(total, Ok(1000));
    assert!(!counter.is_isolated());
}

#[test]
fn test_isolated_knows_when_it_runs_on_its_queue() {
    let state = Isolated::new("knows", Vec::<u32>::new());
    let (sender, receiver) = mpsc::channel();

    let probe = state.clone();
    state.enqueue(move |values| {
        values.push(1);
        let _ = sender.send(probe.is_isolated());
    });

    assert_eq!(collect(&receiver, 1, TIMEOUT), vec![true]);
}

#[test]
fn test_assume_isolated_from_outside_is_fatal() {
    expect_fatal(
        "test_assume_isolated_from_outside_is_fatal",
        "expected to be executing on outsider",
        || {
            let state = Isolated::new("outsider", 0u32);
            state.assume_isolated(|value| *value += 1);
        },
    );
}

#[test]
fn test_reentrant_state_access_is_fatal() {
    expect_fatal(
        "test_reentrant_state_access_is_fatal",
        "is already borrowed",
        || {
            let state = Isolated::new("reentrant", 0u32);
            let (sender, receiver) = mpsc::channel::<()>();

            let inner = state.clone();
            state.enqueue(move |_| {
                inner.assume_isolated(|value| *value += 1);
                drop(sender);
            });

            let _ = receiver.recv_timeout(TIMEOUT);
        },
    );
}

#[test]
fn test_queue_on_a_shut_down_pool_does_not_grow() {
    let target = pool(1);
    let queue = SerialQueue::with_target("after-shutdown", target.clone());
    let ran = Arc::new(AtomicUsize::new(0));
    let unrun = Arc::new(AtomicUsize::new(0));

    target.shutdown();

    for _ in 0..1000 {
        let ran = ran.clone();
        let guard = Unrun(unrun.clone());

        queue.enqueue(job(move || {
            ran.fetch_add(1, Ordering::SeqCst);
            std::mem::forget(guard);
        }));
    }

    assert_eq!(queue.pending_jobs(), 0);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(unrun.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_queue_recovers_once_its_target_accepts_again() {
    let target = Arc::new(Gate::default());
    let queue = SerialQueue::with_target("gated", target.clone());
    let (sender, receiver) = mpsc::channel();

    queue.enqueue(signal(&sender, "rejected"));
    assert_eq!(queue.pending_jobs(), 0);

    target.open.store(true, Ordering::SeqCst);
    queue.enqueue(signal(&sender, "accepted"));
    assert_eq!(queue.pending_jobs(), 1);

    let drains: Vec<Job> = target.jobs.lock().unwrap().drain(..).collect();
    assert_eq!(drains.len(), 1);

    for drain in drains {
        drain.run();
    }

    assert_eq!(collect(&receiver, 1, TIMEOUT), vec!["accepted"]);
    assert!(receiver.try_recv().is_err());
}
