mod common;

use common::{TIMEOUT, collect, expect_fatal};
use strand::dispatch::{is_on_executor, precondition_isolated};
use strand::time::ContinuousClock;
use strand::{
    EventableExecutor, Executor, ExecutorEvent, Job, JobPriority, RunLoop, RunLoopExecutor,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, mpsc};
use std::thread;
use std::time::{Duration, Instant};

fn job(work: impl FnOnce() + Send + 'static) -> Job {
    Job::new(JobPriority::MEDIUM, work)
}

fn counter() -> (Arc<AtomicUsize>, Box<dyn Fn() + Send + Sync>) {
    let count = Arc::new(AtomicUsize::new(0));
    let handler_count = count.clone();

    (
        count,
        Box::new(move || {
            handler_count.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

/// A run loop that only implements the required operations.
struct Minimal;

impl Executor for Minimal {
    fn enqueue(&self, _job: Job) {}

    fn label(&self) -> String {
        "minimal".to_owned()
    }
}

impl RunLoopExecutor for Minimal {
    fn run(&self) {}

    fn stop(&self) {}
}

#[test]
fn test_run_returns_after_stop_from_a_job() {
    let run_loop = RunLoop::with_label("stop");
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        run_loop.enqueue(job(move || order.lock().unwrap().push(i)));
    }

    let stopper = run_loop.clone();
    run_loop.enqueue(job(move || stopper.stop()));

    run_loop.run();

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    assert!(!run_loop.is_running());
    assert_eq!(run_loop.pending_jobs(), 0);
}

#[test]
fn test_stop_while_not_running_is_ignored() {
    let run_loop = RunLoop::with_label("idle");

    run_loop.stop();

    // A stale request would make this run return before the job.
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let stopper = run_loop.clone();
    run_loop.enqueue(job(move || {
        flag.store(true, Ordering::SeqCst);
        stopper.stop();
    }));

    run_loop.run();
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_stop_from_another_thread_wakes_an_idle_loop() {
    let run_loop = RunLoop::with_label("remote-stop");

    let remote = run_loop.clone();
    let stopper = thread::spawn(move || {
        while !remote.is_running() {
            thread::sleep(Duration::from_millis(1));
        }
        remote.stop();
    });

    run_loop.run();
    stopper.join().unwrap();
}

#[test]
fn test_nested_run_stops_innermost_first() {
    let run_loop = RunLoop::with_label("nested");
    let order = Arc::new(Mutex::new(Vec::new()));

    let outer = run_loop.clone();
    let record = order.clone();
    run_loop.enqueue(job(move || {
        record.lock().unwrap().push("outer-start");

        let inner = outer.clone();
        let inner_record = record.clone();
        outer.enqueue(job(move || {
            inner_record.lock().unwrap().push("inner");
            inner.stop();
        }));

        outer.run();

        record.lock().unwrap().push("outer-end");
        outer.stop();
    }));

    run_loop.run();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["outer-start", "inner", "outer-end"]
    );
    assert!(!run_loop.is_running());
}

#[test]
fn test_run_until_returns_once_the_condition_holds() {
    let run_loop = RunLoop::with_label("until");
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let count = count.clone();
        run_loop.enqueue(job(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
    }

    run_loop.run_until(&mut || count.load(Ordering::SeqCst) == 3);

    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert_eq!(run_loop.pending_jobs(), 2);
}

#[test]
fn test_run_until_notices_conditions_changed_elsewhere() {
    let run_loop = RunLoop::with_label("until-idle");
    let done = Arc::new(AtomicBool::new(false));

    let flag = done.clone();
    let setter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    run_loop.run_until(&mut || done.load(Ordering::SeqCst));

    assert!(start.elapsed() < TIMEOUT);
    setter.join().unwrap();
}

#[test]
fn test_default_run_until_is_fatal() {
    expect_fatal(
        "test_default_run_until_is_fatal",
        "run(until:) not supported on minimal",
        || Minimal.run_until(&mut || true),
    );
}

#[test]
fn test_concurrent_run_is_fatal() {
    expect_fatal(
        "test_concurrent_run_is_fatal",
        "is already running",
        || {
            let run_loop = RunLoop::with_label("contended");

            let driver = run_loop.clone();
            thread::spawn(move || driver.run());

            while !run_loop.is_running() {
                thread::sleep(Duration::from_millis(1));
            }

            run_loop.run();
        },
    );
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let run_loop = RunLoop::with_label("timers");
    let order = Arc::new(Mutex::new(Vec::new()));
    let clock = ContinuousClock;

    for (value, delay) in [(3, 30), (1, 10), (2, 20)] {
        let order = order.clone();
        run_loop.enqueue_after(
            job(move || order.lock().unwrap().push(value)),
            Duration::from_millis(delay),
            None,
            &clock,
        );
    }

    let stopper = run_loop.clone();
    run_loop.enqueue_after(
        job(move || stopper.stop()),
        Duration::from_millis(40),
        None,
        &clock,
    );
    assert_eq!(run_loop.pending_timers(), 4);

    let start = Instant::now();
    run_loop.run();

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert_eq!(run_loop.pending_timers(), 0);
}

#[test]
fn test_jobs_are_isolated_to_the_loop() {
    let run_loop = RunLoop::with_label("isolated");
    let (sender, receiver) = mpsc::channel();

    let probe = run_loop.clone();
    run_loop.enqueue(job(move || {
        precondition_isolated(&probe);
        let _ = sender.send(is_on_executor(&probe));
        probe.stop();
    }));

    assert!(!is_on_executor(&run_loop));
    run_loop.run();

    assert_eq!(collect(&receiver, 1, TIMEOUT), vec![true]);
    assert!(!is_on_executor(&run_loop));
}

#[test]
fn test_notifications_coalesce_until_dispatched() {
    let run_loop = RunLoop::with_label("events");
    let (count, handler) = counter();
    let event = run_loop.register_event(handler);

    for _ in 0..5 {
        run_loop.notify(event);
    }
    run_loop.drain();

    let fired = count.load(Ordering::SeqCst);
    assert!((1..=5).contains(&fired));
    assert_eq!(fired, 1);

    run_loop.notify(event);
    run_loop.drain();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    run_loop.deregister(event);
    run_loop.notify(event);
    run_loop.drain();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_deregister_discards_a_queued_firing() {
    let run_loop = RunLoop::with_label("discard");
    let (count, handler) = counter();
    let event = run_loop.register_event(handler);

    run_loop.notify(event);
    run_loop.deregister(event);
    run_loop.drain();

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(run_loop.registered_events(), 0);
}

#[test]
fn test_notify_from_the_handler_fires_once_more() {
    let run_loop = RunLoop::with_label("renotify");
    let count = Arc::new(AtomicUsize::new(0));
    let slot: Arc<OnceLock<ExecutorEvent>> = Arc::new(OnceLock::new());

    let handler_count = count.clone();
    let handler_slot = slot.clone();
    let handler_loop = run_loop.clone();
    let event = run_loop.register_event(Box::new(move || {
        if handler_count.fetch_add(1, Ordering::SeqCst) == 0 {
            let event = *handler_slot.get().unwrap();

            handler_loop.notify(event);
            handler_loop.notify(event);
        }
    }));
    slot.set(event).unwrap();

    run_loop.notify(event);
    run_loop.drain();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(run_loop.pending_jobs(), 1);

    run_loop.drain();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    run_loop.drain();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(run_loop.pending_jobs(), 0);
}

fn repost(run_loop: RunLoop, runs: Arc<AtomicUsize>) {
    let target = run_loop.clone();

    target.enqueue(job(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        repost(run_loop, runs);
    }));
}

#[test]
fn test_drain_leaves_work_posted_while_draining() {
    let run_loop = RunLoop::with_label("repost");
    let runs = Arc::new(AtomicUsize::new(0));

    repost(run_loop.clone(), runs.clone());
    let (sender, receiver) = mpsc::channel();
    run_loop.enqueue(job(move || {
        let _ = sender.send(());
    }));

    run_loop.drain();

    collect(&receiver, 1, TIMEOUT);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(run_loop.pending_jobs(), 1);

    run_loop.drain();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(run_loop.pending_jobs(), 1);
    assert!(!run_loop.is_running());
}

#[test]
fn test_handler_may_deregister_itself() {
    let run_loop = RunLoop::with_label("self-deregister");
    let count = Arc::new(AtomicUsize::new(0));
    let slot: Arc<OnceLock<ExecutorEvent>> = Arc::new(OnceLock::new());

    let handler_count = count.clone();
    let handler_slot = slot.clone();
    let handler_loop = run_loop.clone();
    let event = run_loop.register_event(Box::new(move || {
        handler_count.fetch_add(1, Ordering::SeqCst);
        handler_loop.deregister(*handler_slot.get().unwrap());
    }));
    slot.set(event).unwrap();

    run_loop.notify(event);
    run_loop.drain();
    run_loop.notify(event);
    run_loop.drain();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(run_loop.registered_events(), 0);
}

#[test]
fn test_deregister_waits_for_an_in_flight_handler() {
    let run_loop = RunLoop::with_label("in-flight");
    let done = Arc::new(AtomicBool::new(false));
    let (started_tx, started_rx) = mpsc::channel();

    let flag = done.clone();
    let event = run_loop.register_event(Box::new(move || {
        let _ = started_tx.send(());
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::SeqCst);
    }));

    let remote = run_loop.clone();
    let observed = done.clone();
    let deregistering = thread::spawn(move || {
        started_rx.recv_timeout(TIMEOUT).unwrap();
        remote.deregister(event);
        observed.load(Ordering::SeqCst)
    });

    run_loop.notify(event);
    run_loop.drain();

    assert!(deregistering.join().unwrap());
}

#[test]
fn test_event_tokens_are_never_reused() {
    let run_loop = RunLoop::with_label("tokens");
    let mut seen = Vec::new();

    for _ in 0..4 {
        let (_, handler) = counter();
        let event = run_loop.register_event(handler);

        assert!(!seen.contains(&event));
        seen.push(event);
        run_loop.deregister(event);
    }

    let (_, a) = counter();
    let (_, b) = counter();
    let first = run_loop.register_event(a);
    let second = run_loop.register_event(b);

    assert_ne!(first, second);
    assert!(!seen.contains(&first));
    assert!(!seen.contains(&second));
    assert_eq!(run_loop.registered_events(), 2);
}

#[test]
fn test_notify_for_unknown_event_is_ignored() {
    let run_loop = RunLoop::with_label("unknown");

    run_loop.notify(ExecutorEvent::new(u64::MAX));
    run_loop.drain();

    assert_eq!(run_loop.pending_jobs(), 0);
}

#[test]
fn test_run_loop_clones_are_the_same_executor() {
    let run_loop = RunLoop::with_label("clones");
    let clone = run_loop.clone();

    assert_eq!(run_loop, clone);
    assert_ne!(run_loop, RunLoop::with_label("clones"));
    assert_eq!(clone.label(), "clones");
    assert!(run_loop.supports_scheduling());
}
