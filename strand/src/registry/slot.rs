use crate::error::{ContractViolation, fatal};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use std::sync::Arc;

/// A write-once-before-first-read cell holding a shared executor.
///
/// Writes are allowed, and may overwrite each other, until the first read.
/// The first read either takes the written value or builds one with the
/// factory, and freezes the slot: from then on every read returns that same
/// instance and every write is a contract violation.
pub(crate) struct Slot<T: ?Sized> {
    name: &'static str,
    factory: fn() -> Arc<T>,

    /// Value written before the first read.
    pending: RwLock<Pending<T>>,

    /// Frozen value, filled by the first read.
    value: OnceCell<Arc<T>>,
}

struct Pending<T: ?Sized> {
    value: Option<Arc<T>>,
    read: bool,
}

impl<T: ?Sized> Slot<T> {
    pub(crate) fn new(name: &'static str, factory: fn() -> Arc<T>) -> Self {
        Self {
            name,
            factory,
            pending: RwLock::new(Pending {
                value: None,
                read: false,
            }),
            value: OnceCell::new(),
        }
    }

    /// Reads the slot, initializing it from the factory if nothing was
    /// written.
    pub(crate) fn get(&self) -> Arc<T> {
        self.value
            .get_or_init(|| {
                let written = {
                    let mut pending = self.pending.write();
                    pending.read = true;
                    pending.value.take()
                };

                // The factory runs unlocked so it may peek at the registry.
                written.unwrap_or_else(|| {
                    tracing::debug!(slot = self.name, "initializing from factory");
                    (self.factory)()
                })
            })
            .clone()
    }

    /// The current value without freezing the slot.
    pub(crate) fn peek(&self) -> Option<Arc<T>> {
        match self.value.get() {
            Some(value) => Some(value.clone()),
            None => self.pending.read().value.clone(),
        }
    }

    /// Whether the slot has been read.
    pub(crate) fn is_frozen(&self) -> bool {
        self.pending.read().read
    }

    pub(crate) fn try_set(&self, value: Arc<T>) -> Result<(), ContractViolation> {
        let mut pending = self.pending.write();

        if pending.read {
            return Err(ContractViolation::SlotAlreadyRead { slot: self.name });
        }

        if pending.value.replace(value).is_some() {
            tracing::debug!(slot = self.name, "replacing value written before first read");
        }

        Ok(())
    }

    #[track_caller]
    pub(crate) fn set(&self, value: Arc<T>) {
        if let Err(violation) = self.try_set(value) {
            fatal(violation);
        }
    }
}
