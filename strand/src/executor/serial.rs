use super::{Executor, UnownedSerialExecutor};
use crate::error::{ContractViolation, fatal};
use crate::registry;

use std::ptr;

/// An executor whose jobs never run concurrently with each other.
///
/// A serial executor represents one isolation domain: every job it accepts
/// has exclusive access to the state that domain protects. Parallelism across
/// different serial executors is expected.
pub trait SerialExecutor: Executor {
    /// The non-owning identity of this executor.
    ///
    /// Implementations pick the equality flavor: types implementing
    /// `PartialEq` return [`UnownedSerialExecutor::complex_equality`], others
    /// [`UnownedSerialExecutor::ordinary`].
    fn as_unowned_serial_executor(&self) -> UnownedSerialExecutor;

    /// Whether `other` represents the same exclusive execution context.
    ///
    /// Only consulted by isolation assertions, never by dispatch, and only
    /// for handles built with complex equality. A false negative makes an
    /// assertion fail spuriously; a false positive lets two domains race and
    /// must never happen. The default is pointer identity; types with value
    /// equality override it with `self == other`.
    fn is_same_exclusive_execution_context(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        ptr::eq(self, other)
    }

    /// Last-resort proof that the caller is isolated to this executor.
    ///
    /// Returns only if isolation was proven through some side channel.
    /// Otherwise it terminates the process; it never returns having failed.
    /// The default always terminates.
    fn check_isolated(&self) {
        fatal(ContractViolation::UnexpectedIsolation {
            expected: self.label(),
        })
    }

    /// Non-fatal variant of [`check_isolated`](Self::check_isolated).
    ///
    /// The default delegates to `check_isolated`, so it still terminates on
    /// failure; executors that can answer without crashing override it.
    fn is_isolating_current_context(&self) -> bool {
        self.check_isolated();
        true
    }
}

/// Whether `executor` is the main executor installed in the global registry.
///
/// This is the comparison behind [`Executor::is_main_executor`] for serial
/// executors that can be installed as main executor: identity first, then
/// domain-aware equality. The registry slot is peeked, not frozen.
pub fn is_installed_main_executor<E>(executor: &E) -> bool
where
    E: SerialExecutor + ?Sized,
{
    let Some(main) = registry::global().peek_main_executor() else {
        return false;
    };

    let main = main.as_unowned_serial_executor();
    let this = executor.as_unowned_serial_executor();

    // SAFETY: `main` is kept alive by the strong reference above and `this`
    // by the borrow of `executor`.
    this.ptr_eq(&main) || unsafe { main.is_same_exclusive_execution_context(&this) } == Some(true)
}
