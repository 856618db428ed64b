//! Event handles held by the component that owns a provided interface.
//!
//! Raising an event executes the multicast command behind it: every handler
//! registered by a connected required interface runs (or is queued, for
//! queued handlers) in connection order.

use std::sync::Arc;

use conduit_middleware::{Command, MulticastVoid, MulticastWrite, VoidCommand, WriteCommand};
use conduit_types::ExecutionResult;

/// Zero-argument event source.
#[derive(Clone)]
pub struct EventVoid {
    multicast: Arc<MulticastVoid>,
}

impl EventVoid {
    pub(crate) fn new(multicast: Arc<MulticastVoid>) -> Self {
        Self { multicast }
    }

    pub fn name(&self) -> &str {
        self.multicast.name()
    }

    /// Deliver the event to every attached handler.
    ///
    /// With no handlers attached this is a no-op returning `Ok`.
    pub fn raise(&self) -> ExecutionResult {
        self.multicast.execute()
    }

    pub fn handler_count(&self) -> usize {
        self.multicast.len()
    }
}

/// One-argument event source.
pub struct EventWrite<T> {
    multicast: Arc<MulticastWrite<T>>,
}

impl<T> Clone for EventWrite<T> {
    fn clone(&self) -> Self {
        Self {
            multicast: Arc::clone(&self.multicast),
        }
    }
}

impl<T> EventWrite<T> {
    pub(crate) fn new(multicast: Arc<MulticastWrite<T>>) -> Self {
        Self { multicast }
    }

    pub fn name(&self) -> &str {
        self.multicast.name()
    }

    /// Deliver `value` to every attached handler.  Queued handlers receive
    /// their own copy.
    pub fn raise(&self, value: &T) -> ExecutionResult {
        self.multicast.execute(value)
    }

    pub fn handler_count(&self) -> usize {
        self.multicast.len()
    }
}
