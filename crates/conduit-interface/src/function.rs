//! Function handles – the caller side of a required interface.
//!
//! A function is a named slot that is empty until its required interface is
//! connected, then points at the provider's command (or at a queued
//! decorator around it).  Executing an empty slot returns
//! [`ExecutionResult::NotBound`] and has no side effect.
//!
//! Handles are cheap to clone and may be kept by the owning component's
//! task for its whole life; connect and disconnect retarget the shared slot
//! underneath them.

use std::sync::{Arc, PoisonError, RwLock};

use conduit_middleware::{QualifiedReadCommand, ReadCommand, VoidCommand, WriteCommand};
use conduit_types::ExecutionResult;

/// Shared, retargetable pointer to a command.
pub(crate) struct Slot<C: ?Sized> {
    target: RwLock<Option<Arc<C>>>,
}

impl<C: ?Sized> Slot<C> {
    pub(crate) fn empty() -> Self {
        Self {
            target: RwLock::new(None),
        }
    }

    /// Clone the current target out so the lock is not held while the
    /// command runs.
    pub(crate) fn get(&self) -> Option<Arc<C>> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set(&self, command: Arc<C>) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = Some(command);
    }

    pub(crate) fn clear(&self) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Caller handle for a zero-argument command.
#[derive(Clone)]
pub struct FunctionVoid {
    name: String,
    slot: Arc<Slot<dyn VoidCommand>>,
}

impl FunctionVoid {
    pub(crate) fn new(name: &str, slot: Arc<Slot<dyn VoidCommand>>) -> Self {
        Self {
            name: name.to_string(),
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    pub fn execute(&self) -> ExecutionResult {
        match self.slot.get() {
            Some(command) => command.execute(),
            None => ExecutionResult::NotBound,
        }
    }
}

/// Caller handle for a command that fills a `T`.
pub struct FunctionRead<T> {
    name: String,
    slot: Arc<Slot<dyn ReadCommand<T>>>,
}

impl<T> FunctionRead<T> {
    pub(crate) fn new(name: &str, slot: Arc<Slot<dyn ReadCommand<T>>>) -> Self {
        Self {
            name: name.to_string(),
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    /// Run the provider's command on the caller's thread; `out` is left
    /// untouched unless the result is `Ok`.
    pub fn execute(&self, out: &mut T) -> ExecutionResult {
        match self.slot.get() {
            Some(command) => command.execute(out),
            None => ExecutionResult::NotBound,
        }
    }
}

impl<T> Clone for FunctionRead<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Caller handle for a command that consumes a `T`.
pub struct FunctionWrite<T> {
    name: String,
    slot: Arc<Slot<dyn WriteCommand<T>>>,
}

impl<T> FunctionWrite<T> {
    pub(crate) fn new(name: &str, slot: Arc<Slot<dyn WriteCommand<T>>>) -> Self {
        Self {
            name: name.to_string(),
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    /// On a queued connection `Ok` means *accepted*; the body runs on the
    /// provider's next cycle.
    pub fn execute(&self, arg: &T) -> ExecutionResult {
        match self.slot.get() {
            Some(command) => command.execute(arg),
            None => ExecutionResult::NotBound,
        }
    }
}

impl<T> Clone for FunctionWrite<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Caller handle for a qualified read.
pub struct FunctionQualifiedRead<Q, T> {
    name: String,
    slot: Arc<Slot<dyn QualifiedReadCommand<Q, T>>>,
}

impl<Q, T> FunctionQualifiedRead<Q, T> {
    pub(crate) fn new(name: &str, slot: Arc<Slot<dyn QualifiedReadCommand<Q, T>>>) -> Self {
        Self {
            name: name.to_string(),
            slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    pub fn execute(&self, qualifier: &Q, out: &mut T) -> ExecutionResult {
        match self.slot.get() {
            Some(command) => command.execute(qualifier, out),
            None => ExecutionResult::NotBound,
        }
    }
}

impl<Q, T> Clone for FunctionQualifiedRead<Q, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_middleware::{ReadFn, VoidFn};

    #[test]
    fn unbound_function_reports_not_bound() {
        let function = FunctionVoid::new("Home", Arc::new(Slot::empty()));
        assert!(!function.is_bound());
        assert_eq!(function.execute(), ExecutionResult::NotBound);
    }

    #[test]
    fn retargeting_slot_affects_existing_handles() {
        let slot: Arc<Slot<dyn ReadCommand<u32>>> = Arc::new(Slot::empty());
        let function = FunctionRead::new("GetCount", Arc::clone(&slot));
        let copy = function.clone();

        slot.set(Arc::new(ReadFn::new("GetCount", |out: &mut u32| *out = 7)));
        let mut value = 0;
        assert_eq!(copy.execute(&mut value), ExecutionResult::Ok);
        assert_eq!(value, 7);

        slot.clear();
        let mut untouched = 1;
        assert_eq!(function.execute(&mut untouched), ExecutionResult::NotBound);
        assert_eq!(untouched, 1);
    }

    #[test]
    fn bound_void_runs_command() {
        let slot: Arc<Slot<dyn VoidCommand>> = Arc::new(Slot::empty());
        slot.set(Arc::new(VoidFn::new("Home", || {})));
        let function = FunctionVoid::new("Home", slot);
        assert!(function.is_bound());
        assert_eq!(function.execute(), ExecutionResult::Ok);
    }
}
