use super::{SerialExecutor, TaskExecutor};

use std::any::{TypeId, type_name};
use std::fmt;
use std::ptr::NonNull;

/// How two [`UnownedSerialExecutor`]s are compared during isolation checks.
#[derive(Clone, Copy)]
enum Equality {
    /// Pointer identity is the whole story.
    Ordinary,

    /// Same concrete type → ask the executor.
    ///
    /// The function is monomorphized for the concrete executor type and is
    /// only ever called with two pointers of that type.
    Complex(unsafe fn(*const (), *const ()) -> bool),
}

/// A non-owning reference to a [`SerialExecutor`].
///
/// This is the identity token the runtime passes around instead of a strong
/// handle, so the hot scheduling path never touches reference counts.
///
/// # Lifetime
///
/// The handle does not keep the executor alive. Whoever owns the executor
/// (an actor, the registry, a task) must keep it alive for as long as any
/// handle or any job enqueued on it may still be resolved. Resolving a handle
/// after the last owner is gone is undefined behavior.
#[derive(Clone, Copy)]
pub struct UnownedSerialExecutor {
    executor: NonNull<dyn SerialExecutor>,
    type_id: TypeId,
    type_name: &'static str,
    equality: Equality,
}

// SAFETY: the referenced executor is `Send + Sync`; the handle only exposes
// shared access to it.
unsafe impl Send for UnownedSerialExecutor {}
unsafe impl Sync for UnownedSerialExecutor {}

impl UnownedSerialExecutor {
    /// References `executor` with identity-only equality.
    pub fn ordinary<E>(executor: &E) -> Self
    where
        E: SerialExecutor + 'static,
    {
        Self::build(executor, Equality::Ordinary)
    }

    /// References `executor` with domain-aware equality.
    ///
    /// Isolation checks comparing two handles of the same concrete type `E`
    /// will fall back to [`SerialExecutor::is_same_exclusive_execution_context`]
    /// when the pointers differ.
    pub fn complex_equality<E>(executor: &E) -> Self
    where
        E: SerialExecutor + PartialEq + 'static,
    {
        Self::build(executor, Equality::Complex(same_context::<E>))
    }

    fn build<E>(executor: &E, equality: Equality) -> Self
    where
        E: SerialExecutor + 'static,
    {
        let erased: &(dyn SerialExecutor + 'static) = executor;

        Self {
            executor: NonNull::from(erased),
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            equality,
        }
    }

    /// Whether this handle was built with complex equality.
    pub fn is_complex_equality(&self) -> bool {
        matches!(self.equality, Equality::Complex(_))
    }

    /// Address of the referenced executor.
    pub fn addr(&self) -> *const () {
        self.executor.as_ptr() as *const ()
    }

    /// Whether both handles point at the same executor object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    /// Whether both handles reference executors of the same concrete type.
    pub fn same_type(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }

    /// Name of the referenced executor's concrete type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Asks the executor behind `self` whether `current` shares its
    /// exclusive execution context.
    ///
    /// Returns `None` when the comparison is not applicable: ordinary
    /// equality, or a different concrete type.
    ///
    /// # Safety
    ///
    /// Both referenced executors must still be alive.
    pub unsafe fn is_same_exclusive_execution_context(&self, current: &Self) -> Option<bool> {
        match self.equality {
            Equality::Complex(compare) if self.same_type(current) => {
                // SAFETY: both pointers reference live executors of the type
                // `compare` was instantiated for.
                Some(unsafe { compare(current.addr(), self.addr()) })
            }
            _ => None,
        }
    }

    /// Resolves the handle.
    ///
    /// # Safety
    ///
    /// The executor must still be alive for the whole lifetime `'a`.
    pub unsafe fn as_serial_executor<'a>(&self) -> &'a dyn SerialExecutor {
        // SAFETY: upheld by the caller.
        unsafe { self.executor.as_ref() }
    }
}

impl PartialEq for UnownedSerialExecutor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for UnownedSerialExecutor {}

impl fmt::Debug for UnownedSerialExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnownedSerialExecutor")
            .field("executor", &self.type_name)
            .field("addr", &self.addr())
            .field("complex_equality", &self.is_complex_equality())
            .finish()
    }
}

unsafe fn same_context<E>(current: *const (), expected: *const ()) -> bool
where
    E: SerialExecutor + 'static,
{
    // SAFETY: only called through `Equality::Complex` after the type ids of
    // both handles matched `E`.
    let (current, expected) = unsafe { (&*(current as *const E), &*(expected as *const E)) };

    current.is_same_exclusive_execution_context(expected)
}

/// A non-owning reference to a [`TaskExecutor`].
///
/// Same lifetime rules as [`UnownedSerialExecutor`]. Equality is pointer
/// identity.
#[derive(Clone, Copy)]
pub struct UnownedTaskExecutor {
    executor: NonNull<dyn TaskExecutor>,
    type_name: &'static str,
}

// SAFETY: see `UnownedSerialExecutor`.
unsafe impl Send for UnownedTaskExecutor {}
unsafe impl Sync for UnownedTaskExecutor {}

impl UnownedTaskExecutor {
    pub fn new<E>(executor: &E) -> Self
    where
        E: TaskExecutor + 'static,
    {
        let erased: &(dyn TaskExecutor + 'static) = executor;

        Self {
            executor: NonNull::from(erased),
            type_name: type_name::<E>(),
        }
    }

    pub fn addr(&self) -> *const () {
        self.executor.as_ptr() as *const ()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolves the handle.
    ///
    /// # Safety
    ///
    /// The executor must still be alive for the whole lifetime `'a`.
    pub unsafe fn as_task_executor<'a>(&self) -> &'a dyn TaskExecutor {
        // SAFETY: upheld by the caller.
        unsafe { self.executor.as_ref() }
    }
}

impl PartialEq for UnownedTaskExecutor {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for UnownedTaskExecutor {}

impl fmt::Debug for UnownedTaskExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnownedTaskExecutor")
            .field("executor", &self.type_name)
            .field("addr", &self.addr())
            .finish()
    }
}
