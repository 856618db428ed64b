//! `conduit-kernel` – components and their supervision.
//!
//! # Modules
//!
//! - [`component`] – [`Component`][component::Component]: named provided /
//!   required interfaces, a [`Task`][component::Task] body, and the
//!   Constructed → Created → Running ↔ Stopped → Terminated state machine
//!   with one thread per active component.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: tracks the heartbeat
//!   each active component sends per cycle and reports frozen ones.

pub mod component;
pub mod watchdog;

pub use component::{Component, ComponentDescription, ComponentKind, Task};
pub use watchdog::{ComponentHealth, Watchdog};
