//! Process-wide executor wiring.
//!
//! A [`Registry`] holds two slots, the main executor and the default task
//! executor. Each slot is filled lazily from an [`ExecutorFactory`] on first
//! read and is write-once-before-first-read: replacing a slot after anyone
//! has read it is a contract violation, because jobs may already have been
//! enqueued on the old instance.
//!
//! The process uses one global registry, reachable through [`global`] and
//! the [`main_executor`] / [`default_executor`] shortcuts. Bootstrap code that
//! wants other executors installs them before the first read, either one by
//! one or through [`create_executors`].

mod slot;

use crate::error::ContractViolation;
use crate::executor::{MainExecutor, TaskExecutor};
use crate::runtime::builder::ThreadPoolBuilder;
use crate::runtime::run_loop::RunLoop;
use slot::Slot;

use once_cell::sync::Lazy;

use std::sync::Arc;

const MAIN_EXECUTOR: &str = "main executor";
const DEFAULT_EXECUTOR: &str = "default executor";

/// Strategy supplying the process-wide executors.
///
/// Both constructors are called at most once per registry, on the first read
/// of the matching slot. They may peek at the registry and read the other
/// slot, but reading the slot being built blocks forever.
pub trait ExecutorFactory {
    fn main_executor() -> Arc<dyn MainExecutor>;

    fn default_executor() -> Arc<dyn TaskExecutor>;
}

/// The executors shipped with this crate: a [`RunLoop`] as main executor and
/// a [`ThreadPoolExecutor`](crate::ThreadPoolExecutor) sized to the machine
/// as default executor.
pub struct PlatformExecutorFactory;

impl ExecutorFactory for PlatformExecutorFactory {
    fn main_executor() -> Arc<dyn MainExecutor> {
        Arc::new(RunLoop::new())
    }

    fn default_executor() -> Arc<dyn TaskExecutor> {
        Arc::new(ThreadPoolBuilder::new().build())
    }
}

/// The main and default executor slots.
pub struct Registry {
    main: Slot<dyn MainExecutor>,
    default: Slot<dyn TaskExecutor>,
}

impl Registry {
    /// Creates a registry whose slots fall back to `F` on first read.
    pub fn new<F: ExecutorFactory>() -> Self {
        Self {
            main: Slot::new(MAIN_EXECUTOR, F::main_executor),
            default: Slot::new(DEFAULT_EXECUTOR, F::default_executor),
        }
    }

    /// The main executor. Freezes the slot.
    pub fn main_executor(&self) -> Arc<dyn MainExecutor> {
        self.main.get()
    }

    /// The default task executor. Freezes the slot.
    pub fn default_executor(&self) -> Arc<dyn TaskExecutor> {
        self.default.get()
    }

    /// Installs the main executor.
    ///
    /// Terminates the process if the slot has already been read.
    #[track_caller]
    pub fn set_main_executor(&self, executor: Arc<dyn MainExecutor>) {
        self.main.set(executor);
    }

    /// Installs the main executor, or reports why it cannot be installed.
    pub fn try_set_main_executor(
        &self,
        executor: Arc<dyn MainExecutor>,
    ) -> Result<(), ContractViolation> {
        self.main.try_set(executor)
    }

    /// Installs the default task executor.
    ///
    /// Terminates the process if the slot has already been read.
    #[track_caller]
    pub fn set_default_executor(&self, executor: Arc<dyn TaskExecutor>) {
        self.default.set(executor);
    }

    /// Installs the default task executor, or reports why it cannot be
    /// installed.
    pub fn try_set_default_executor(
        &self,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<(), ContractViolation> {
        self.default.try_set(executor)
    }

    /// Installs both executors built by `F`.
    ///
    /// Terminates the process if either slot has already been read.
    #[track_caller]
    pub fn install<F: ExecutorFactory>(&self) {
        tracing::debug!(factory = std::any::type_name::<F>(), "installing executors");

        self.set_main_executor(F::main_executor());
        self.set_default_executor(F::default_executor());
    }

    /// The main executor if one was written or read, without freezing the
    /// slot.
    pub fn peek_main_executor(&self) -> Option<Arc<dyn MainExecutor>> {
        self.main.peek()
    }

    /// The default executor if one was written or read, without freezing the
    /// slot.
    pub fn peek_default_executor(&self) -> Option<Arc<dyn TaskExecutor>> {
        self.default.peek()
    }

    /// Whether the main executor slot has been read.
    pub fn is_main_executor_frozen(&self) -> bool {
        self.main.is_frozen()
    }

    /// Whether the default executor slot has been read.
    pub fn is_default_executor_frozen(&self) -> bool {
        self.default.is_frozen()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new::<PlatformExecutorFactory>()
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::default);

/// The process-wide registry.
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// The process-wide main executor.
pub fn main_executor() -> Arc<dyn MainExecutor> {
    GLOBAL.main_executor()
}

/// The process-wide default task executor.
pub fn default_executor() -> Arc<dyn TaskExecutor> {
    GLOBAL.default_executor()
}

/// Installs the executors of `F` as the process-wide executors.
///
/// Must run before anything reads either slot; otherwise the process is
/// terminated.
#[track_caller]
pub fn create_executors<F: ExecutorFactory>() {
    GLOBAL.install::<F>();
}
