use crate::executor::{SerialExecutor, UnownedSerialExecutor};
use crate::runtime::context;

/// Steps 1 and 2 of the isolation check: identity, then domain-aware
/// equality for complex-equality executors of the same type.
///
/// # Safety
///
/// `expected` must reference a live executor.
pub(super) unsafe fn matches_current(expected: UnownedSerialExecutor) -> bool {
    let Some(current) = context::current_executor() else {
        return false;
    };

    if current.ptr_eq(&expected) {
        return true;
    }

    // SAFETY: `current` is installed only while its executor is running a
    // job on this thread, `expected` is live per the caller.
    unsafe { expected.is_same_exclusive_execution_context(&current) }.unwrap_or(false)
}

/// Returns if the calling context is isolated to `expected`, terminates the
/// process otherwise.
///
/// In order:
/// 1. the active serial executor is `expected`,
/// 2. `expected` uses complex equality, the active executor has the same
///    concrete type and both represent the same exclusive execution context,
/// 3. `expected.check_isolated()` proves isolation through its own side
///    channel (or terminates).
///
/// # Safety
///
/// `expected` must reference a live executor.
#[track_caller]
pub unsafe fn check_expected_executor(expected: UnownedSerialExecutor) {
    // SAFETY: forwarded from the caller.
    if unsafe { matches_current(expected) } {
        return;
    }

    tracing::trace!(expected = expected.type_name(), "falling back to check_isolated");

    // SAFETY: forwarded from the caller.
    unsafe { expected.as_serial_executor() }.check_isolated();
}

/// Non-fatal variant of [`check_expected_executor`]: step 3 asks
/// [`SerialExecutor::is_isolating_current_context`] instead.
///
/// # Safety
///
/// `expected` must reference a live executor.
pub unsafe fn task_is_current_executor(expected: UnownedSerialExecutor) -> bool {
    // SAFETY: forwarded from the caller.
    if unsafe { matches_current(expected) } {
        return true;
    }

    // SAFETY: forwarded from the caller.
    unsafe { expected.as_serial_executor() }.is_isolating_current_context()
}

/// Whether the calling context is isolated to `executor`.
///
/// Never terminates the process as long as `executor` overrides
/// `is_isolating_current_context`; the default of that hook delegates to
/// `check_isolated` and does.
pub fn is_on_executor<E>(executor: &E) -> bool
where
    E: SerialExecutor + ?Sized,
{
    // SAFETY: `executor` is borrowed for the whole call.
    unsafe { task_is_current_executor(executor.as_unowned_serial_executor()) }
}

/// Terminates the process unless the calling context is isolated to
/// `executor`. Checked in every build.
#[track_caller]
pub fn precondition_isolated<E>(executor: &E)
where
    E: SerialExecutor + ?Sized,
{
    // SAFETY: `executor` is borrowed for the whole call.
    unsafe { check_expected_executor(executor.as_unowned_serial_executor()) }
}

/// Like [`precondition_isolated`], but only checked in debug builds.
#[track_caller]
pub fn assert_isolated<E>(executor: &E)
where
    E: SerialExecutor + ?Sized,
{
    if cfg!(debug_assertions) {
        precondition_isolated(executor);
    }
}

/// Checks that the calling context is isolated to `executor`, then runs `f`
/// synchronously.
///
/// This is how code that is known to run on a domain (a callback from the
/// domain's own executor, say) gets at state guarded by that domain.
#[track_caller]
pub fn assume_isolated<E, R>(executor: &E, f: impl FnOnce() -> R) -> R
where
    E: SerialExecutor + ?Sized,
{
    precondition_isolated(executor);

    f()
}
