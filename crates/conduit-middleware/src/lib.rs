//! `conduit-middleware` – command objects and the queues that carry them.
//!
//! Everything here is independent of interfaces and components: it only
//! knows how to run a command, how to park an invocation until its owner
//! gets around to it, and how to fan one invocation out to many targets.
//!
//! # Modules
//!
//! - [`command`] – the [`Command`] base plus the four signature traits
//!   ([`VoidCommand`], [`ReadCommand`], [`WriteCommand`],
//!   [`QualifiedReadCommand`]) and their closure-backed implementations.
//! - [`mailbox`] – [`Mailbox`]: bounded multi-producer / single-consumer
//!   FIFO of pending invocations.
//! - [`queued`] – decorators that push into a [`Mailbox`] instead of running.
//! - [`multicast`] – composite commands that invoke every member in order.
//! - [`bus`] – [`LifecycleBus`]: broadcast channel for component lifecycle
//!   events.

pub mod bus;
pub mod command;
pub mod mailbox;
pub mod multicast;
pub mod queued;

pub use bus::{LifecycleBus, LifecycleReceiver, LifecycleTopic};
pub use command::{
    Command, CommandBase, QualifiedReadCommand, QualifiedReadFn, ReadCommand, ReadFn, VoidCommand,
    VoidFn, WriteCommand, WriteFn,
};
pub use mailbox::{Invocation, Mailbox};
pub use multicast::{MemberId, MulticastVoid, MulticastWrite};
pub use queued::{QueuedVoid, QueuedWrite};
