use super::core::Task;

use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Returns the `RawWakerVTable` for a task of type `T`.
///
/// # Safety
///
/// All functions in the vtable expect a pointer obtained from
/// `Arc::<Task<T>>::into_raw` and keep the reference count balanced.
fn vtable<T: Send + 'static>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(
        clone_raw::<T>,
        wake_raw::<T>,
        wake_by_ref_raw::<T>,
        drop_raw::<T>,
    )
}

/// Creates a [`Waker`] that routes a new job for `task` when woken.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    // SAFETY: the data pointer comes from `Arc::into_raw` and matches the
    // vtable's type parameter.
    unsafe {
        Waker::from_raw(RawWaker::new(
            Arc::into_raw(task) as *const (),
            vtable::<T>(),
        ))
    }
}

fn clone_raw<T: Send + 'static>(ptr: *const ()) -> RawWaker {
    // SAFETY: `ptr` comes from `Arc::into_raw`; the original is forgotten
    // again so only the clone adds a count.
    let arc = unsafe { Arc::<Task<T>>::from_raw(ptr as *const Task<T>) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<T>())
}

fn wake_raw<T: Send + 'static>(ptr: *const ()) {
    // SAFETY: consumes the waker's count.
    let arc = unsafe { Arc::<Task<T>>::from_raw(ptr as *const Task<T>) };
    arc.wake();
}

fn wake_by_ref_raw<T: Send + 'static>(ptr: *const ()) {
    // SAFETY: borrows the waker's count without consuming it.
    let arc = unsafe { Arc::<Task<T>>::from_raw(ptr as *const Task<T>) };
    arc.clone().wake();
    mem::forget(arc);
}

fn drop_raw<T: Send + 'static>(ptr: *const ()) {
    // SAFETY: releases the waker's count.
    drop(unsafe { Arc::<Task<T>>::from_raw(ptr as *const Task<T>) });
}
