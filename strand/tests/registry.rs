mod common;

use common::expect_fatal;
use strand::registry::{ExecutorFactory, Registry};
use strand::{
    ContractViolation, Executor, MainExecutor, RunLoop, TaskExecutor, ThreadPoolBuilder,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::thread;

static MAIN_BUILDS: AtomicUsize = AtomicUsize::new(0);
static DEFAULT_BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Counts how often each slot falls back to the factory.
struct CountingFactory;

impl ExecutorFactory for CountingFactory {
    fn main_executor() -> Arc<dyn MainExecutor> {
        MAIN_BUILDS.fetch_add(1, Ordering::SeqCst);
        Arc::new(RunLoop::with_label("counted-main"))
    }

    fn default_executor() -> Arc<dyn TaskExecutor> {
        DEFAULT_BUILDS.fetch_add(1, Ordering::SeqCst);
        Arc::new(ThreadPoolBuilder::new().worker_threads(1).build())
    }
}

/// Factory for registries whose slots are always written before being read.
struct Unreachable;

impl ExecutorFactory for Unreachable {
    fn main_executor() -> Arc<dyn MainExecutor> {
        unreachable!("main executor was written before the first read")
    }

    fn default_executor() -> Arc<dyn TaskExecutor> {
        unreachable!("default executor was written before the first read")
    }
}

struct LabeledFactory;

impl ExecutorFactory for LabeledFactory {
    fn main_executor() -> Arc<dyn MainExecutor> {
        Arc::new(RunLoop::with_label("installed-main"))
    }

    fn default_executor() -> Arc<dyn TaskExecutor> {
        Arc::new(
            ThreadPoolBuilder::new()
                .worker_threads(1)
                .thread_name("installed-pool")
                .build(),
        )
    }
}

/// Registry whose factory looks at the registry it is building for.
static OBSERVED: LazyLock<Registry> = LazyLock::new(Registry::new::<PeekingFactory>);

/// What the factory saw of the default slot: (peeked value, frozen).
static PEEKED_WHILE_BUILDING: Mutex<Option<(bool, bool)>> = Mutex::new(None);

struct PeekingFactory;

impl ExecutorFactory for PeekingFactory {
    fn main_executor() -> Arc<dyn MainExecutor> {
        Arc::new(RunLoop::with_label("peeking-main"))
    }

    fn default_executor() -> Arc<dyn TaskExecutor> {
        let seen = (
            OBSERVED.peek_default_executor().is_some(),
            OBSERVED.is_default_executor_frozen(),
        );
        *PEEKED_WHILE_BUILDING.lock().unwrap() = Some(seen);

        // Reading the other slot is fine as well.
        let _ = OBSERVED.main_executor();

        Arc::new(
            ThreadPoolBuilder::new()
                .worker_threads(1)
                .thread_name("peeking-pool")
                .build(),
        )
    }
}

fn same<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

fn pool() -> Arc<dyn TaskExecutor> {
    Arc::new(ThreadPoolBuilder::new().worker_threads(1).build())
}

#[test]
fn test_factory_runs_once_per_slot() {
    let registry = Registry::new::<CountingFactory>();

    assert!(!registry.is_default_executor_frozen());
    assert!(registry.peek_default_executor().is_none());

    let first = registry.default_executor();
    let second = thread::scope(|scope| {
        scope
            .spawn(|| registry.default_executor())
            .join()
            .unwrap()
    });

    assert!(same(&first, &second));
    assert_eq!(
        first.as_unowned_task_executor(),
        second.as_unowned_task_executor()
    );
    assert_eq!(DEFAULT_BUILDS.load(Ordering::SeqCst), 1);

    assert!(registry.is_default_executor_frozen());
    assert!(!registry.is_main_executor_frozen());
    assert_eq!(MAIN_BUILDS.load(Ordering::SeqCst), 0);

    let main = registry.main_executor();
    assert_eq!(main.label(), "counted-main");
    assert!(same(&main, &registry.main_executor()));
    assert_eq!(MAIN_BUILDS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_written_value_is_returned_by_every_read() {
    let registry = Registry::new::<Unreachable>();
    let installed = pool();

    registry.set_default_executor(installed.clone());

    let read = registry.default_executor();
    assert!(same(&installed, &read));
    assert!(same(&read, &registry.default_executor()));
}

#[test]
fn test_last_write_before_first_read_wins() {
    let registry = Registry::new::<Unreachable>();
    let first = Arc::new(RunLoop::with_label("first"));
    let second = Arc::new(RunLoop::with_label("second"));

    registry.set_main_executor(first);
    registry.set_main_executor(second.clone());

    let read = registry.main_executor();
    assert!(same(&read, &second));
    assert_eq!(read.label(), "second");
}

#[test]
fn test_try_set_after_read_is_rejected() {
    let registry = Registry::new::<Unreachable>();
    let original = pool();

    registry.set_default_executor(original.clone());
    let _ = registry.default_executor();

    let violation = registry.try_set_default_executor(pool()).unwrap_err();
    assert_eq!(
        violation,
        ContractViolation::SlotAlreadyRead {
            slot: "default executor"
        }
    );
    assert!(violation.to_string().contains("already read"));

    assert!(same(&registry.default_executor(), &original));
}

#[test]
fn test_peek_does_not_freeze_the_slot() {
    let registry = Registry::new::<Unreachable>();
    let run_loop = Arc::new(RunLoop::new());

    assert!(registry.peek_main_executor().is_none());

    registry.set_main_executor(run_loop.clone());
    let peeked = registry.peek_main_executor().unwrap();

    assert!(same(&peeked, &run_loop));
    assert!(!registry.is_main_executor_frozen());
    assert!(
        registry
            .try_set_main_executor(Arc::new(RunLoop::new()))
            .is_ok()
    );
}

#[test]
fn test_install_fills_both_slots() {
    let registry = Registry::new::<Unreachable>();

    registry.install::<LabeledFactory>();

    assert_eq!(registry.main_executor().label(), "installed-main");
    assert_eq!(registry.default_executor().label(), "installed-pool");
}

#[test]
fn test_set_after_read_is_fatal() {
    expect_fatal(
        "test_set_after_read_is_fatal",
        "main executor was already read",
        || {
            let registry = Registry::new::<LabeledFactory>();

            let _ = registry.main_executor();
            registry.set_main_executor(Arc::new(RunLoop::new()));
        },
    );
}

#[test]
fn test_factory_may_peek_at_the_slot_it_builds() {
    let default = OBSERVED.default_executor();

    assert_eq!(default.label(), "peeking-pool");
    assert_eq!(*PEEKED_WHILE_BUILDING.lock().unwrap(), Some((false, true)));
    assert!(OBSERVED.is_main_executor_frozen());
    assert!(same(&OBSERVED.peek_default_executor().unwrap(), &default));
}
