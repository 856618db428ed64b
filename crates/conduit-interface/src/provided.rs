//! [`ProvidedInterface`] – the named set of commands and events a component
//! exposes to others.
//!
//! Commands are registered during configuration with one of the four
//! `add_command_*` methods and are never removed.  Names are unique across
//! the whole interface, whatever their signature.
//!
//! # Queuing
//!
//! With [`QueuingPolicy::CommandsQueued`] every connected required interface
//! gets its own *endpoint*: a [`Mailbox`] owned by this interface and
//! drained by the owning component in [`ProvidedInterface::process_mailboxes`].
//! Void and Write invocations from that connection are parked there, so the
//! command bodies only ever run on the owner's thread.  Read and
//! QualifiedRead always run directly on the caller's thread.
//!
//! With [`QueuingPolicy::CommandsNotQueued`] callers run every command body
//! on their own thread.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use conduit_interface::ProvidedInterface;
//! use conduit_types::{QueuingPolicy, SignatureKind};
//!
//! let control = ProvidedInterface::new("Robot", "Control", QueuingPolicy::CommandsQueued, 16);
//! let speed = Arc::new(Mutex::new(0.0_f64));
//! let state = Arc::clone(&speed);
//! control
//!     .add_command_write("SetSpeed", move |v: &f64| *state.lock().unwrap() = *v)
//!     .unwrap();
//!
//! assert_eq!(control.names_of_commands(SignatureKind::Write), vec!["SetSpeed"]);
//! assert!(control.add_command_void("SetSpeed", || {}).is_err());
//! ```

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use conduit_middleware::{
    Command, Invocation, Mailbox, MulticastVoid, MulticastWrite, QualifiedReadCommand,
    QualifiedReadFn, ReadCommand, ReadFn, VoidCommand, VoidFn, WriteCommand, WriteFn,
};
use conduit_types::{ConduitError, ExecutionResult, QueuingPolicy, SignatureKind};
use tracing::{debug, warn};

use crate::description::{CommandDescription, EventDescription, ProvidedDescription};
use crate::event::{EventVoid, EventWrite};

// ─────────────────────────────────────────────────────────────────────────────
// Registry entries
// ─────────────────────────────────────────────────────────────────────────────

/// Turns a type-erased argument into a parked invocation, or `None` when the
/// argument has the wrong type.
type ErasedInvoker = Box<dyn Fn(&dyn Any) -> Option<Invocation> + Send + Sync>;

struct Registered {
    kind: SignatureKind,
    argument_type: Option<&'static str>,
    control: Arc<dyn Command>,
    /// `Arc<dyn VoidCommand>`, `Arc<dyn WriteCommand<T>>`, … depending on `kind`.
    typed: Box<dyn Any + Send + Sync>,
    /// Only Void and Write commands can be invoked by name.
    by_name: Option<ErasedInvoker>,
}

struct RegisteredEvent {
    kind: SignatureKind,
    argument_type: Option<&'static str>,
    /// `Arc<MulticastVoid>` or `Arc<MulticastWrite<T>>`.
    typed: Box<dyn Any + Send + Sync>,
    handler_count: Box<dyn Fn() -> usize + Send + Sync>,
}

struct Endpoint {
    mailbox: Arc<Mailbox>,
    /// Set on disconnect; the endpoint is removed once drained empty.
    retired: AtomicBool,
}

/// Why a slot could not be bound to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BindMiss {
    NotFound,
    WrongSignature {
        found: SignatureKind,
    },
    ArgumentType {
        expected: Option<&'static str>,
        found: Option<&'static str>,
    },
}

impl fmt::Display for BindMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindMiss::NotFound => write!(f, "no command with that name"),
            BindMiss::WrongSignature { found } => write!(f, "command has {found} signature"),
            BindMiss::ArgumentType { expected, found } => write!(
                f,
                "argument type mismatch (expected {}, found {})",
                expected.unwrap_or("()"),
                found.unwrap_or("()")
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProvidedInterface
// ─────────────────────────────────────────────────────────────────────────────

/// Named set of commands and events exposed by one component.
pub struct ProvidedInterface {
    owner: String,
    name: String,
    policy: QueuingPolicy,
    mailbox_capacity: usize,
    commands: RwLock<BTreeMap<String, Registered>>,
    events: RwLock<BTreeMap<String, RegisteredEvent>>,
    endpoints: Mutex<Vec<Arc<Endpoint>>>,
    /// Endpoint used by [`ProvidedInterface::execute_by_name`] when queued.
    by_name_endpoint: Option<Arc<Mailbox>>,
    connections: AtomicUsize,
}

impl ProvidedInterface {
    /// Create an empty interface owned by component `owner`.
    ///
    /// `mailbox_capacity` is the size of each per-connection endpoint when
    /// `policy` is [`QueuingPolicy::CommandsQueued`].
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        policy: QueuingPolicy,
        mailbox_capacity: usize,
    ) -> Self {
        let owner = owner.into();
        let name = name.into();
        let mut endpoints = Vec::new();
        let by_name_endpoint = match policy {
            QueuingPolicy::CommandsQueued => {
                let mailbox = Arc::new(Mailbox::new(
                    format!("{owner}.{name}<-by-name"),
                    mailbox_capacity,
                ));
                endpoints.push(Arc::new(Endpoint {
                    mailbox: Arc::clone(&mailbox),
                    retired: AtomicBool::new(false),
                }));
                Some(mailbox)
            }
            QueuingPolicy::CommandsNotQueued => None,
        };
        Self {
            owner,
            name,
            policy,
            mailbox_capacity,
            commands: RwLock::new(BTreeMap::new()),
            events: RwLock::new(BTreeMap::new()),
            endpoints: Mutex::new(endpoints),
            by_name_endpoint,
            connections: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning component.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn policy(&self) -> QueuingPolicy {
        self.policy
    }

    /// Number of required interfaces currently connected.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Acquire)
    }

    // ── Command registration ─────────────────────────────────────────────────

    /// Register a zero-argument command.
    ///
    /// Returns the command's control handle (enable / disable).
    ///
    /// # Errors
    ///
    /// [`ConduitError::DuplicateName`] if any command already uses `name`;
    /// the existing command is left untouched.
    pub fn add_command_void(
        &self,
        name: &str,
        body: impl Fn() + Send + Sync + 'static,
    ) -> Result<Arc<dyn Command>, ConduitError> {
        let command = Arc::new(VoidFn::new(name, body));
        let typed: Arc<dyn VoidCommand> = command.clone();
        let invoke_target = Arc::clone(&typed);
        let by_name: ErasedInvoker = Box::new(move |_arg: &dyn Any| {
            let target = Arc::clone(&invoke_target);
            Some(Box::new(move || target.execute()) as Invocation)
        });
        self.insert_command(
            name,
            Registered {
                kind: SignatureKind::Void,
                argument_type: None,
                control: command,
                typed: Box::new(typed),
                by_name: Some(by_name),
            },
        )
    }

    /// Register a command that fills a caller-owned `T`.
    pub fn add_command_read<T>(
        &self,
        name: &str,
        body: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<Arc<dyn Command>, ConduitError>
    where
        T: 'static,
    {
        let command = Arc::new(ReadFn::new(name, body));
        let typed: Arc<dyn ReadCommand<T>> = command.clone();
        self.insert_command(
            name,
            Registered {
                kind: SignatureKind::Read,
                argument_type: Some(type_name::<T>()),
                control: command,
                typed: Box::new(typed),
                by_name: None,
            },
        )
    }

    /// Register a command that consumes a `T`.
    ///
    /// `T: Clone` because queued invocations carry a copy of the argument.
    pub fn add_command_write<T>(
        &self,
        name: &str,
        body: impl Fn(&T) + Send + Sync + 'static,
    ) -> Result<Arc<dyn Command>, ConduitError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let command = Arc::new(WriteFn::new(name, body));
        let typed: Arc<dyn WriteCommand<T>> = command.clone();
        let invoke_target = Arc::clone(&typed);
        let by_name: ErasedInvoker = Box::new(move |arg: &dyn Any| {
            let value = arg.downcast_ref::<T>()?.clone();
            let target = Arc::clone(&invoke_target);
            Some(Box::new(move || target.execute(&value)) as Invocation)
        });
        self.insert_command(
            name,
            Registered {
                kind: SignatureKind::Write,
                argument_type: Some(type_name::<T>()),
                control: command,
                typed: Box::new(typed),
                by_name: Some(by_name),
            },
        )
    }

    /// Register a command that reads a `T` qualified by a `Q`.
    pub fn add_command_qualified_read<Q, T>(
        &self,
        name: &str,
        body: impl Fn(&Q, &mut T) + Send + Sync + 'static,
    ) -> Result<Arc<dyn Command>, ConduitError>
    where
        Q: 'static,
        T: 'static,
    {
        let command = Arc::new(QualifiedReadFn::new(name, body));
        let typed: Arc<dyn QualifiedReadCommand<Q, T>> = command.clone();
        self.insert_command(
            name,
            Registered {
                kind: SignatureKind::QualifiedRead,
                argument_type: Some(type_name::<(Q, T)>()),
                control: command,
                typed: Box::new(typed),
                by_name: None,
            },
        )
    }

    fn insert_command(
        &self,
        name: &str,
        entry: Registered,
    ) -> Result<Arc<dyn Command>, ConduitError> {
        let mut commands = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        if commands.contains_key(name) {
            warn!(interface = %self.name, command = name, "duplicate command name rejected");
            return Err(ConduitError::DuplicateName {
                kind: "command",
                name: name.to_string(),
            });
        }
        let control = Arc::clone(&entry.control);
        debug!(interface = %self.name, command = name, kind = %entry.kind, "command added");
        commands.insert(name.to_string(), entry);
        Ok(control)
    }

    // ── Event registration ───────────────────────────────────────────────────

    /// Declare a zero-argument event this interface may raise.
    pub fn add_event_void(&self, name: &str) -> Result<EventVoid, ConduitError> {
        let multicast = Arc::new(MulticastVoid::new(name));
        let counted = Arc::clone(&multicast);
        self.insert_event(
            name,
            RegisteredEvent {
                kind: SignatureKind::Void,
                argument_type: None,
                typed: Box::new(Arc::clone(&multicast)),
                handler_count: Box::new(move || counted.len()),
            },
        )?;
        Ok(EventVoid::new(multicast))
    }

    /// Declare a one-argument event this interface may raise.
    pub fn add_event_write<T>(&self, name: &str) -> Result<EventWrite<T>, ConduitError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let multicast = Arc::new(MulticastWrite::<T>::new(name));
        let counted = Arc::clone(&multicast);
        self.insert_event(
            name,
            RegisteredEvent {
                kind: SignatureKind::Write,
                argument_type: Some(type_name::<T>()),
                typed: Box::new(Arc::clone(&multicast)),
                handler_count: Box::new(move || counted.len()),
            },
        )?;
        Ok(EventWrite::new(multicast))
    }

    fn insert_event(&self, name: &str, entry: RegisteredEvent) -> Result<(), ConduitError> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        if events.contains_key(name) {
            warn!(interface = %self.name, event = name, "duplicate event name rejected");
            return Err(ConduitError::DuplicateName {
                kind: "event",
                name: name.to_string(),
            });
        }
        debug!(interface = %self.name, event = name, kind = %entry.kind, "event added");
        events.insert(name.to_string(), entry);
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Control handle of the command called `name`, whatever its signature.
    pub fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| Arc::clone(&entry.control))
    }

    /// Names of the commands with signature `kind`, in name order.
    pub fn names_of_commands(&self, kind: SignatureKind) -> Vec<String> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names of the events with signature `kind`, in name order.
    pub fn names_of_events(&self, kind: SignatureKind) -> Vec<String> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Resolve `name` to a typed command handle of signature `kind`.
    pub(crate) fn resolve<C>(
        &self,
        kind: SignatureKind,
        name: &str,
        expected: Option<&'static str>,
    ) -> Result<Arc<C>, BindMiss>
    where
        C: ?Sized + 'static,
    {
        let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
        let entry = commands.get(name).ok_or(BindMiss::NotFound)?;
        if entry.kind != kind {
            return Err(BindMiss::WrongSignature { found: entry.kind });
        }
        entry
            .typed
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or(BindMiss::ArgumentType {
                expected,
                found: entry.argument_type,
            })
    }

    /// Resolve `name` to the event's multicast command, if the event exists
    /// with a matching signature and argument type.
    pub(crate) fn resolve_event<M>(&self, kind: SignatureKind, name: &str) -> Option<Arc<M>>
    where
        M: 'static,
    {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let entry = events.get(name)?;
        if entry.kind != kind {
            return None;
        }
        entry.typed.downcast_ref::<Arc<M>>().cloned()
    }

    // ── Invocation by name ───────────────────────────────────────────────────

    /// Invoke a Void or Write command addressed only by name, with a
    /// type-erased argument (ignored for Void commands).
    ///
    /// Honours the queuing policy: on a queued interface the invocation is
    /// parked in a dedicated endpoint and runs on the owner's next drain.
    ///
    /// Returns [`ExecutionResult::NotBound`] for an unknown name and
    /// [`ExecutionResult::ArgumentError`] for a Read-style command or an
    /// argument of the wrong type.
    pub fn execute_by_name(&self, name: &str, arg: &dyn Any) -> ExecutionResult {
        let invocation = {
            let commands = self.commands.read().unwrap_or_else(PoisonError::into_inner);
            let Some(entry) = commands.get(name) else {
                return ExecutionResult::NotBound;
            };
            if !entry.control.is_enabled() {
                return ExecutionResult::Disabled;
            }
            let Some(invoker) = entry.by_name.as_ref() else {
                return ExecutionResult::ArgumentError;
            };
            match invoker(arg) {
                Some(invocation) => invocation,
                None => return ExecutionResult::ArgumentError,
            }
        };
        match &self.by_name_endpoint {
            Some(mailbox) => match mailbox.push(name, invocation) {
                Ok(()) => ExecutionResult::Ok,
                Err(_) => ExecutionResult::MailboxFull,
            },
            None => invocation(),
        }
    }

    // ── Endpoints ────────────────────────────────────────────────────────────

    /// Allocate the per-connection mailbox for `user`; `None` when commands
    /// are not queued.
    pub(crate) fn allocate_endpoint(&self, user: &str) -> Option<Arc<Mailbox>> {
        match self.policy {
            QueuingPolicy::CommandsNotQueued => None,
            QueuingPolicy::CommandsQueued => {
                let mailbox = Arc::new(Mailbox::new(
                    format!("{}.{}<-{}", self.owner, self.name, user),
                    self.mailbox_capacity,
                ));
                self.lock_endpoints().push(Arc::new(Endpoint {
                    mailbox: Arc::clone(&mailbox),
                    retired: AtomicBool::new(false),
                }));
                debug!(mailbox = %mailbox.name(), capacity = self.mailbox_capacity, "endpoint allocated");
                Some(mailbox)
            }
        }
    }

    /// Retire the endpoint; it keeps being drained until empty, then goes.
    pub(crate) fn retire_endpoint(&self, mailbox: &Arc<Mailbox>) {
        for endpoint in self.lock_endpoints().iter() {
            if Arc::ptr_eq(&endpoint.mailbox, mailbox) {
                endpoint.retired.store(true, Ordering::Release);
            }
        }
    }

    pub(crate) fn connection_added(&self) {
        self.connections.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn connection_removed(&self) {
        self.connections.fetch_sub(1, Ordering::AcqRel);
    }

    /// Number of live endpoint mailboxes, including the by-name endpoint.
    pub fn endpoint_count(&self) -> usize {
        self.lock_endpoints().len()
    }

    /// Drain every endpoint mailbox in allocation order.
    ///
    /// Must only be called from the owning component's thread.  Returns the
    /// number of commands executed.
    ///
    /// # Errors
    ///
    /// [`ConduitError::MailboxCorrupted`] from the first corrupted mailbox.
    pub fn process_mailboxes(&self) -> Result<usize, ConduitError> {
        let snapshot: Vec<Arc<Endpoint>> = self.lock_endpoints().clone();
        let mut executed = 0;
        for endpoint in &snapshot {
            executed += endpoint.mailbox.drain()?;
        }
        self.lock_endpoints()
            .retain(|e| !(e.retired.load(Ordering::Acquire) && e.mailbox.is_empty()));
        Ok(executed)
    }

    /// Invocations rejected by any endpoint since the previous call.
    pub fn take_unreported_drops(&self) -> u64 {
        self.lock_endpoints()
            .iter()
            .map(|e| e.mailbox.take_unreported_drops())
            .sum()
    }

    fn lock_endpoints(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Endpoint>>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Snapshot of the interface for external tooling.
    pub fn description(&self) -> ProvidedDescription {
        let commands = self
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, entry)| CommandDescription {
                name: name.clone(),
                kind: entry.kind,
                argument_type: entry.argument_type.map(str::to_string),
                enabled: entry.control.is_enabled(),
            })
            .collect();
        let events = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, entry)| EventDescription {
                name: name.clone(),
                kind: entry.kind,
                argument_type: entry.argument_type.map(str::to_string),
                handlers: (entry.handler_count)(),
            })
            .collect();
        ProvidedDescription {
            owner: self.owner.clone(),
            name: self.name.clone(),
            policy: self.policy,
            connections: self.connection_count(),
            commands,
            events,
        }
    }
}

impl fmt::Display for ProvidedInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.description(), f)
    }
}

impl fmt::Debug for ProvidedInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedInterface")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn speed_interface(policy: QueuingPolicy) -> (ProvidedInterface, Arc<Mutex<Vec<f64>>>) {
        let provided = ProvidedInterface::new("Robot", "Control", policy, 4);
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        provided
            .add_command_write("SetSpeed", move |v: &f64| sink.lock().unwrap().push(*v))
            .unwrap();
        (provided, recorded)
    }

    #[test]
    fn duplicate_command_keeps_original() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsNotQueued);
        let Err(err) = provided.add_command_void("SetSpeed", || {}) else {
            panic!("duplicate command name accepted");
        };
        assert!(matches!(err, ConduitError::DuplicateName { kind: "command", .. }));

        let typed: Arc<dyn WriteCommand<f64>> = provided
            .resolve(SignatureKind::Write, "SetSpeed", None)
            .unwrap();
        typed.execute(&2.0);
        assert_eq!(*recorded.lock().unwrap(), vec![2.0]);
    }

    #[test]
    fn resolve_distinguishes_misses() {
        let (provided, _) = speed_interface(QueuingPolicy::CommandsNotQueued);

        let missing = provided.resolve::<dyn VoidCommand>(SignatureKind::Void, "Home", None);
        assert_eq!(missing.err(), Some(BindMiss::NotFound));

        let wrong_kind =
            provided.resolve::<dyn VoidCommand>(SignatureKind::Void, "SetSpeed", None);
        assert_eq!(
            wrong_kind.err(),
            Some(BindMiss::WrongSignature {
                found: SignatureKind::Write
            })
        );

        let wrong_type = provided.resolve::<dyn WriteCommand<i32>>(
            SignatureKind::Write,
            "SetSpeed",
            Some("i32"),
        );
        assert!(matches!(wrong_type.err(), Some(BindMiss::ArgumentType { .. })));
    }

    #[test]
    fn names_are_listed_per_signature() {
        let provided = ProvidedInterface::new("Robot", "Control", QueuingPolicy::CommandsNotQueued, 4);
        provided.add_command_void("Home", || {}).unwrap();
        provided.add_command_void("Enable", || {}).unwrap();
        provided.add_command_read("GetPosition", |_: &mut f64| {}).unwrap();
        provided
            .add_command_qualified_read("Convert", |_: &f64, _: &mut i64| {})
            .unwrap();

        assert_eq!(provided.names_of_commands(SignatureKind::Void), vec!["Enable", "Home"]);
        assert_eq!(provided.names_of_commands(SignatureKind::Read), vec!["GetPosition"]);
        assert_eq!(
            provided.names_of_commands(SignatureKind::QualifiedRead),
            vec!["Convert"]
        );
        assert!(provided.names_of_commands(SignatureKind::Write).is_empty());
    }

    #[test]
    fn duplicate_event_rejected() {
        let provided = ProvidedInterface::new("Robot", "Control", QueuingPolicy::CommandsNotQueued, 4);
        provided.add_event_void("Moved").unwrap();
        assert!(provided.add_event_write::<u32>("Moved").is_err());
        assert_eq!(provided.names_of_events(SignatureKind::Void), vec!["Moved"]);
    }

    #[test]
    fn execute_by_name_direct() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsNotQueued);
        assert_eq!(provided.execute_by_name("SetSpeed", &3.5_f64), ExecutionResult::Ok);
        assert_eq!(*recorded.lock().unwrap(), vec![3.5]);
    }

    #[test]
    fn execute_by_name_rejects_bad_arguments() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsNotQueued);
        provided.add_command_read("GetSpeed", |_: &mut f64| {}).unwrap();

        assert_eq!(provided.execute_by_name("SetSpeed", &"fast"), ExecutionResult::ArgumentError);
        assert_eq!(provided.execute_by_name("GetSpeed", &()), ExecutionResult::ArgumentError);
        assert_eq!(provided.execute_by_name("Nope", &()), ExecutionResult::NotBound);
        assert!(recorded.lock().unwrap().is_empty());
    }

    #[test]
    fn execute_by_name_queued_waits_for_owner() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsQueued);
        assert_eq!(provided.execute_by_name("SetSpeed", &1.0_f64), ExecutionResult::Ok);
        assert!(recorded.lock().unwrap().is_empty());

        assert_eq!(provided.process_mailboxes().unwrap(), 1);
        assert_eq!(*recorded.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn disabled_command_not_invoked_by_name() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsNotQueued);
        provided.command("SetSpeed").unwrap().disable();
        assert_eq!(provided.execute_by_name("SetSpeed", &1.0_f64), ExecutionResult::Disabled);
        assert!(recorded.lock().unwrap().is_empty());
    }

    #[test]
    fn retired_endpoint_is_drained_then_removed() {
        let (provided, recorded) = speed_interface(QueuingPolicy::CommandsQueued);
        assert_eq!(provided.endpoint_count(), 1);

        let endpoint = provided.allocate_endpoint("Controller.Motor").unwrap();
        assert_eq!(provided.endpoint_count(), 2);

        let typed: Arc<dyn WriteCommand<f64>> = provided
            .resolve(SignatureKind::Write, "SetSpeed", None)
            .unwrap();
        let value = 4.0;
        endpoint
            .push("SetSpeed", Box::new(move || typed.execute(&value)))
            .unwrap();
        provided.retire_endpoint(&endpoint);

        assert_eq!(provided.process_mailboxes().unwrap(), 1);
        assert_eq!(*recorded.lock().unwrap(), vec![4.0]);
        assert_eq!(provided.endpoint_count(), 1);
    }

    #[test]
    fn not_queued_interface_has_no_endpoints() {
        let (provided, _) = speed_interface(QueuingPolicy::CommandsNotQueued);
        assert!(provided.allocate_endpoint("x").is_none());
        assert_eq!(provided.endpoint_count(), 0);
        assert_eq!(provided.process_mailboxes().unwrap(), 0);
    }
}
