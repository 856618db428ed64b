//! `conduit-runtime` – running a component system.
//!
//! # Modules
//!
//! - [`manager`] – [`ComponentManager`][manager::ComponentManager]: owns the
//!   components of a process, connects their interfaces by name, drives
//!   create / start / stop / kill across all of them and renders the system
//!   graph.
//! - [`config`] – [`ManagerConfig`][config::ManagerConfig]: TOML-backed
//!   tunables (mailbox capacity, watchdog policy, kill timeout) with
//!   `CONDUIT_*` environment overrides.
//! - [`supervisor`] – [`supervise`][supervisor::supervise]: async watchdog
//!   polling until the system has terminated.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod manager;
pub mod supervisor;
pub mod telemetry;

pub use config::ManagerConfig;
pub use manager::{ComponentManager, ConnectionRecord, SystemDescription};
pub use supervisor::supervise;
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
