//! Command objects.
//!
//! A command is a named, individually enable-able operation with one of four
//! signatures:
//!
//! | Trait | Call | Typical use |
//! |---|---|---|
//! | [`VoidCommand`] | `execute()` | trigger an action |
//! | [`ReadCommand<T>`] | `execute(&mut T)` | provider fills a caller buffer |
//! | [`WriteCommand<T>`] | `execute(&T)` | caller hands data to the provider |
//! | [`QualifiedReadCommand<Q, T>`] | `execute(&Q, &mut T)` | conversion or indexed read |
//!
//! The `*Fn` structs wrap a closure; decorators in [`crate::queued`] and
//! composites in [`crate::multicast`] implement the same traits so a bound
//! function slot never needs to know which one it holds.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use conduit_middleware::command::{Command, VoidCommand, VoidFn};
//! use conduit_types::ExecutionResult;
//!
//! let hits = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&hits);
//! let reset = VoidFn::new("Reset", move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(reset.execute(), ExecutionResult::Ok);
//! reset.disable();
//! assert_eq!(reset.execute(), ExecutionResult::Disabled);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use conduit_types::ExecutionResult;

// ─────────────────────────────────────────────────────────────────────────────
// Base
// ─────────────────────────────────────────────────────────────────────────────

/// Name and enabled flag shared by every command implementation.
#[derive(Debug)]
pub struct CommandBase {
    name: String,
    enabled: AtomicBool,
}

impl CommandBase {
    /// A new, enabled base.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Behaviour common to all four signatures.
pub trait Command: Send + Sync {
    /// Access to the shared name / enabled state.
    fn base(&self) -> &CommandBase;

    /// Stable name, unique within the owning interface.
    fn name(&self) -> &str {
        self.base().name()
    }

    fn enable(&self) {
        self.base().set_enabled(true);
    }

    /// Subsequent executions return [`ExecutionResult::Disabled`] without
    /// running the body.
    fn disable(&self) {
        self.base().set_enabled(false);
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signature traits
// ─────────────────────────────────────────────────────────────────────────────

/// Zero-argument command.
pub trait VoidCommand: Command {
    fn execute(&self) -> ExecutionResult;
}

/// Command that fills a caller-owned buffer.
pub trait ReadCommand<T>: Command {
    fn execute(&self, out: &mut T) -> ExecutionResult;
}

/// Command that consumes a caller-supplied value.
///
/// The argument is only borrowed for the duration of the call; queued
/// implementations clone it.
pub trait WriteCommand<T>: Command {
    fn execute(&self, arg: &T) -> ExecutionResult;
}

/// Command that reads `T` qualified by `Q` (an index, a conversion input, …).
pub trait QualifiedReadCommand<Q, T>: Command {
    fn execute(&self, qualifier: &Q, out: &mut T) -> ExecutionResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure-backed commands
// ─────────────────────────────────────────────────────────────────────────────

type VoidBody = Box<dyn Fn() + Send + Sync>;
type ReadBody<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type WriteBody<T> = Box<dyn Fn(&T) + Send + Sync>;
type QualifiedReadBody<Q, T> = Box<dyn Fn(&Q, &mut T) + Send + Sync>;

/// [`VoidCommand`] running a closure.
pub struct VoidFn {
    base: CommandBase,
    body: VoidBody,
}

impl VoidFn {
    pub fn new(name: impl Into<String>, body: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            base: CommandBase::new(name),
            body: Box::new(body),
        }
    }
}

impl Command for VoidFn {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl VoidCommand for VoidFn {
    fn execute(&self) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.body)();
        ExecutionResult::Ok
    }
}

/// [`ReadCommand`] running a closure.
pub struct ReadFn<T> {
    base: CommandBase,
    body: ReadBody<T>,
}

impl<T> ReadFn<T> {
    pub fn new(name: impl Into<String>, body: impl Fn(&mut T) + Send + Sync + 'static) -> Self {
        Self {
            base: CommandBase::new(name),
            body: Box::new(body),
        }
    }
}

impl<T> Command for ReadFn<T> {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl<T> ReadCommand<T> for ReadFn<T> {
    fn execute(&self, out: &mut T) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.body)(out);
        ExecutionResult::Ok
    }
}

/// [`WriteCommand`] running a closure.
pub struct WriteFn<T> {
    base: CommandBase,
    body: WriteBody<T>,
}

impl<T> WriteFn<T> {
    pub fn new(name: impl Into<String>, body: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            base: CommandBase::new(name),
            body: Box::new(body),
        }
    }
}

impl<T> Command for WriteFn<T> {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl<T> WriteCommand<T> for WriteFn<T> {
    fn execute(&self, arg: &T) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.body)(arg);
        ExecutionResult::Ok
    }
}

/// [`QualifiedReadCommand`] running a closure.
pub struct QualifiedReadFn<Q, T> {
    base: CommandBase,
    body: QualifiedReadBody<Q, T>,
}

impl<Q, T> QualifiedReadFn<Q, T> {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&Q, &mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            base: CommandBase::new(name),
            body: Box::new(body),
        }
    }
}

impl<Q, T> Command for QualifiedReadFn<Q, T> {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl<Q, T> QualifiedReadCommand<Q, T> for QualifiedReadFn<Q, T> {
    fn execute(&self, qualifier: &Q, out: &mut T) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        (self.body)(qualifier, out);
        ExecutionResult::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn read_fills_caller_buffer() {
        let position = Arc::new(Mutex::new(1.25_f64));
        let state = Arc::clone(&position);
        let cmd = ReadFn::new("GetPosition", move |out: &mut f64| {
            *out = *state.lock().unwrap();
        });

        let mut buffer = 0.0;
        assert_eq!(cmd.execute(&mut buffer), ExecutionResult::Ok);
        assert_eq!(buffer, 1.25);
    }

    #[test]
    fn write_passes_argument_through() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let cmd = WriteFn::new("SetSpeed", move |v: &f64| sink.lock().unwrap().push(*v));

        assert_eq!(cmd.execute(&5.0), ExecutionResult::Ok);
        assert_eq!(*recorded.lock().unwrap(), vec![5.0]);
    }

    #[test]
    fn qualified_read_uses_both_arguments() {
        let cmd = QualifiedReadFn::new("Scale", |factor: &i32, out: &mut i32| *out *= *factor);
        let mut value = 7;
        assert_eq!(cmd.execute(&3, &mut value), ExecutionResult::Ok);
        assert_eq!(value, 21);
    }

    #[test]
    fn disabled_write_has_no_side_effect() {
        let recorded = Arc::new(Mutex::new(0.0_f64));
        let sink = Arc::clone(&recorded);
        let cmd = WriteFn::new("SetSpeed", move |v: &f64| *sink.lock().unwrap() = *v);

        cmd.disable();
        assert!(!cmd.is_enabled());
        assert_eq!(cmd.execute(&9.0), ExecutionResult::Disabled);
        assert_eq!(*recorded.lock().unwrap(), 0.0);

        cmd.enable();
        assert_eq!(cmd.execute(&9.0), ExecutionResult::Ok);
        assert_eq!(*recorded.lock().unwrap(), 9.0);
    }

    #[test]
    fn disabled_read_leaves_buffer_untouched() {
        let cmd = ReadFn::new("GetCount", |out: &mut u32| *out = 42);
        cmd.disable();
        let mut buffer = 3;
        assert_eq!(cmd.execute(&mut buffer), ExecutionResult::Disabled);
        assert_eq!(buffer, 3);
    }

    #[test]
    fn name_is_preserved() {
        let cmd = VoidFn::new("Home", || {});
        assert_eq!(cmd.name(), "Home");
    }
}
