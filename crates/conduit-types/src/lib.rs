//! `conduit-types` – vocabulary shared by every Conduit crate.
//!
//! Holds the command result codes, the signature and policy enums used when
//! declaring interfaces, the component lifecycle states, the lifecycle event
//! envelope, and the workspace-wide [`ConduitError`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default number of slots in a mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;

/// Outcome of executing a command.
///
/// Commands run inside a scheduler loop that must never unwind, so every
/// runtime outcome is a value of this type rather than an error or a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionResult {
    /// The command body ran (or, for queued commands, was accepted).
    Ok,
    /// The command is disabled; nothing happened.
    Disabled,
    /// The function slot has no command bound to it.
    NotBound,
    /// The argument does not match the command's signature.
    ArgumentError,
    /// The target mailbox is full and the invocation was dropped.
    MailboxFull,
}

impl ExecutionResult {
    /// `true` for [`ExecutionResult::Ok`].
    pub fn is_ok(self) -> bool {
        self == ExecutionResult::Ok
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionResult::Ok => "OK",
            ExecutionResult::Disabled => "DISABLED",
            ExecutionResult::NotBound => "NOT_BOUND",
            ExecutionResult::ArgumentError => "ARGUMENT_ERROR",
            ExecutionResult::MailboxFull => "MAILBOX_FULL",
        };
        f.write_str(s)
    }
}

/// The four command signature classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignatureKind {
    /// No argument.
    Void,
    /// One out-parameter filled by the provider.
    Read,
    /// One in-parameter supplied by the caller.
    Write,
    /// One in-parameter (the qualifier) and one out-parameter.
    QualifiedRead,
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignatureKind::Void => "void",
            SignatureKind::Read => "read",
            SignatureKind::Write => "write",
            SignatureKind::QualifiedRead => "qualified-read",
        };
        f.write_str(s)
    }
}

/// Whether a provided interface queues incoming Void/Write invocations.
///
/// Fixed when the interface is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuingPolicy {
    /// Callers push into a per-connection mailbox drained by the owner.
    CommandsQueued,
    /// Callers execute the command body directly on their own thread.
    CommandsNotQueued,
}

/// Whether a function slot must be matched at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Required,
    Optional,
}

/// How an event handler is invoked when the provider raises the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDelivery {
    /// Pushed into the required interface's mailbox, run on the consumer's cycle.
    Queued,
    /// Run immediately on the provider's thread.
    Direct,
}

/// Lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentState {
    Constructed,
    Created,
    Running,
    Stopped,
    Terminated,
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentState::Constructed => "constructed",
            ComponentState::Created => "created",
            ComponentState::Running => "running",
            ComponentState::Stopped => "stopped",
            ComponentState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Envelope for everything published on the lifecycle bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Name of the component the event concerns.
    pub component: String,
    pub payload: LifecyclePayload,
}

impl LifecycleEvent {
    /// Stamp a new event for `component`.
    pub fn new(component: impl Into<String>, payload: LifecyclePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            component: component.into(),
            payload,
        }
    }
}

/// What happened to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecyclePayload {
    StateChanged {
        from: ComponentState,
        to: ComponentState,
    },
    /// A mailbox rejected invocations since the previous report.
    MailboxOverflow { interface: String, dropped: u64 },
    /// The run cycle hit a defect and the component was terminated.
    CycleFault { message: String },
    /// The component missed its heartbeat deadline.
    HeartbeatMissed,
}

/// Workspace-wide error type for configuration, binding and lifecycle
/// failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConduitError {
    #[error("Bind failed for required interface \"{interface}\": missing required {missing:?}")]
    Bind {
        interface: String,
        missing: Vec<String>,
    },

    #[error("Duplicate {kind} \"{name}\"")]
    DuplicateName { kind: &'static str, name: String },

    #[error("No {kind} named \"{name}\"")]
    NotFound { kind: &'static str, name: String },

    #[error("Mailbox \"{mailbox}\" is full (capacity {capacity})")]
    MailboxFull { mailbox: String, capacity: usize },

    #[error("Mailbox \"{mailbox}\" corrupted: {len} entries for capacity {capacity}")]
    MailboxCorrupted {
        mailbox: String,
        len: usize,
        capacity: usize,
    },

    #[error("Interface \"{interface}\" is already connected")]
    AlreadyConnected { interface: String },

    #[error("Interface \"{interface}\" is not connected")]
    NotConnected { interface: String },

    #[error("Interface \"{interface}\" still has {connections} active connection(s)")]
    InterfaceInUse {
        interface: String,
        connections: usize,
    },

    #[error("Interface \"{interface}\" has no mailbox for queued event handler \"{handler}\"")]
    NoMailbox { interface: String, handler: String },

    #[error("Component \"{component}\" cannot go from {from} to {to}")]
    InvalidTransition {
        component: String,
        from: ComponentState,
        to: ComponentState,
    },

    #[error("Component \"{component}\" did not reach {state} in time")]
    Timeout {
        component: String,
        state: ComponentState,
    },

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_display_uses_wire_names() {
        assert_eq!(ExecutionResult::Ok.to_string(), "OK");
        assert_eq!(ExecutionResult::NotBound.to_string(), "NOT_BOUND");
        assert_eq!(ExecutionResult::ArgumentError.to_string(), "ARGUMENT_ERROR");
        assert!(ExecutionResult::Ok.is_ok());
        assert!(!ExecutionResult::Disabled.is_ok());
    }

    #[test]
    fn execution_result_serializes_screaming_case() {
        let json = serde_json::to_string(&ExecutionResult::MailboxFull).unwrap();
        assert_eq!(json, "\"MAILBOX_FULL\"");
    }

    #[test]
    fn lifecycle_event_roundtrip() {
        let event = LifecycleEvent::new(
            "Robot1",
            LifecyclePayload::StateChanged {
                from: ComponentState::Created,
                to: ComponentState::Running,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: LifecycleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.component, "Robot1");
        assert_eq!(back.payload, event.payload);
    }

    #[test]
    fn bind_error_lists_missing_names() {
        let err = ConduitError::Bind {
            interface: "Motor".to_string(),
            missing: vec!["SetSpeed".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Motor"));
        assert!(msg.contains("SetSpeed"));
    }

    #[test]
    fn invalid_transition_display() {
        let err = ConduitError::InvalidTransition {
            component: "Robot1".to_string(),
            from: ComponentState::Constructed,
            to: ComponentState::Running,
        };
        assert_eq!(
            err.to_string(),
            "Component \"Robot1\" cannot go from constructed to running"
        );
    }
}
