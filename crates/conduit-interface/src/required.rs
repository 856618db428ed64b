//! [`RequiredInterface`] – the function slots and event handlers a component
//! needs from exactly one provided interface.
//!
//! # Binding protocol
//!
//! [`RequiredInterface::connect`] walks every declared function and looks its
//! name up in the provided interface:
//!
//! 1. a match with the same signature and argument type binds the slot,
//!    wrapped in a queued decorator when the provider queues commands
//!    (Void and Write only);
//! 2. a miss on an [`Requirement::Optional`] slot leaves it empty;
//! 3. a miss on a [`Requirement::Required`] slot aborts the connect, empties
//!    every slot and returns [`ConduitError::Bind`] naming all misses.
//!
//! After the functions are bound, each event handler is attached to the
//! provider's event of the same name.  A provider that does not raise a
//! handled event is logged and skipped.
//!
//! [`RequiredInterface::disconnect`] empties every slot, detaches every
//! handler and retires the per-connection endpoint.  Invocations already
//! queued in that endpoint still run; each holds its own handle to the
//! command.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use conduit_middleware::{
    Command, Mailbox, MulticastVoid, MulticastWrite, QualifiedReadCommand, QueuedVoid,
    QueuedWrite, ReadCommand, VoidCommand, VoidFn, WriteCommand, WriteFn,
};
use conduit_types::{ConduitError, EventDelivery, Requirement, SignatureKind};
use tracing::{debug, info, warn};

use crate::description::{EventHandlerDescription, FunctionDescription, RequiredDescription};
use crate::function::{FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionWrite, Slot};
use crate::provided::{BindMiss, ProvidedInterface};

// ─────────────────────────────────────────────────────────────────────────────
// Slot binding
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a resolved command for the connection's endpoint, if any.
type Wrap<C> = fn(Arc<C>, Option<&Arc<Mailbox>>) -> Arc<C>;

trait SlotBinding: Send + Sync {
    fn kind(&self) -> SignatureKind;
    fn requirement(&self) -> Requirement;
    fn argument_type(&self) -> Option<&'static str>;
    fn bind(
        &self,
        name: &str,
        provided: &ProvidedInterface,
        endpoint: Option<&Arc<Mailbox>>,
    ) -> Result<(), BindMiss>;
    fn clear(&self);
    fn is_bound(&self) -> bool;
}

/// A typed slot together with what is needed to resolve it.  One generic
/// implementation serves all four signatures.
struct Binding<C: ?Sized> {
    kind: SignatureKind,
    requirement: Requirement,
    argument_type: Option<&'static str>,
    slot: Arc<Slot<C>>,
    wrap: Wrap<C>,
}

impl<C> SlotBinding for Binding<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    fn kind(&self) -> SignatureKind {
        self.kind
    }

    fn requirement(&self) -> Requirement {
        self.requirement
    }

    fn argument_type(&self) -> Option<&'static str> {
        self.argument_type
    }

    fn bind(
        &self,
        name: &str,
        provided: &ProvidedInterface,
        endpoint: Option<&Arc<Mailbox>>,
    ) -> Result<(), BindMiss> {
        let command = provided.resolve::<C>(self.kind, name, self.argument_type)?;
        self.slot.set((self.wrap)(command, endpoint));
        Ok(())
    }

    fn clear(&self) {
        self.slot.clear();
    }

    fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }
}

fn direct<C: ?Sized>(command: Arc<C>, _endpoint: Option<&Arc<Mailbox>>) -> Arc<C> {
    command
}

fn queued_void(
    command: Arc<dyn VoidCommand>,
    endpoint: Option<&Arc<Mailbox>>,
) -> Arc<dyn VoidCommand> {
    match endpoint {
        Some(mailbox) => Arc::new(QueuedVoid::new(command, Arc::clone(mailbox))),
        None => command,
    }
}

fn queued_write<T>(
    command: Arc<dyn WriteCommand<T>>,
    endpoint: Option<&Arc<Mailbox>>,
) -> Arc<dyn WriteCommand<T>>
where
    T: Clone + Send + Sync + 'static,
{
    match endpoint {
        Some(mailbox) => Arc::new(QueuedWrite::new(command, Arc::clone(mailbox))),
        None => command,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event handler binding
// ─────────────────────────────────────────────────────────────────────────────

type Detach = Box<dyn FnOnce() + Send>;

trait HandlerBinding: Send + Sync {
    fn kind(&self) -> SignatureKind;
    fn delivery(&self) -> EventDelivery;
    fn control(&self) -> &Arc<dyn Command>;
    /// Add the handler to the provider's multicast; `None` if the provider
    /// has no matching event.
    fn attach(&self, name: &str, provided: &ProvidedInterface) -> Option<Detach>;
}

struct VoidHandler {
    delivery: EventDelivery,
    control: Arc<dyn Command>,
    command: Arc<dyn VoidCommand>,
}

impl HandlerBinding for VoidHandler {
    fn kind(&self) -> SignatureKind {
        SignatureKind::Void
    }

    fn delivery(&self) -> EventDelivery {
        self.delivery
    }

    fn control(&self) -> &Arc<dyn Command> {
        &self.control
    }

    fn attach(&self, name: &str, provided: &ProvidedInterface) -> Option<Detach> {
        let multicast = provided.resolve_event::<MulticastVoid>(SignatureKind::Void, name)?;
        let member = multicast.add(Arc::clone(&self.command));
        Some(Box::new(move || {
            multicast.remove(member);
        }))
    }
}

struct WriteHandler<T> {
    delivery: EventDelivery,
    control: Arc<dyn Command>,
    command: Arc<dyn WriteCommand<T>>,
}

impl<T> HandlerBinding for WriteHandler<T>
where
    T: Send + Sync + 'static,
{
    fn kind(&self) -> SignatureKind {
        SignatureKind::Write
    }

    fn delivery(&self) -> EventDelivery {
        self.delivery
    }

    fn control(&self) -> &Arc<dyn Command> {
        &self.control
    }

    fn attach(&self, name: &str, provided: &ProvidedInterface) -> Option<Detach> {
        let multicast = provided.resolve_event::<MulticastWrite<T>>(SignatureKind::Write, name)?;
        let member = multicast.add(Arc::clone(&self.command));
        Some(Box::new(move || {
            multicast.remove(member);
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequiredInterface
// ─────────────────────────────────────────────────────────────────────────────

struct Connection {
    provided: Arc<ProvidedInterface>,
    endpoint: Option<Arc<Mailbox>>,
    detachers: Vec<Detach>,
}

/// Named set of function slots and event handlers bound to one provided
/// interface at a time.
pub struct RequiredInterface {
    owner: String,
    name: String,
    /// Receives queued event handler invocations; drained by the owner.
    mailbox: Option<Arc<Mailbox>>,
    functions: RwLock<BTreeMap<String, Box<dyn SlotBinding>>>,
    handlers: RwLock<BTreeMap<String, Box<dyn HandlerBinding>>>,
    connection: Mutex<Option<Connection>>,
}

impl RequiredInterface {
    /// Create an unconnected interface owned by component `owner`.
    ///
    /// `event_mailbox_capacity` of `None` means the interface can only
    /// register [`EventDelivery::Direct`] handlers.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        event_mailbox_capacity: Option<usize>,
    ) -> Self {
        let owner = owner.into();
        let name = name.into();
        let mailbox = event_mailbox_capacity
            .map(|capacity| Arc::new(Mailbox::new(format!("{owner}.{name}<-events"), capacity)));
        Self {
            owner,
            name,
            mailbox,
            functions: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(BTreeMap::new()),
            connection: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn has_mailbox(&self) -> bool {
        self.mailbox.is_some()
    }

    // ── Functions ────────────────────────────────────────────────────────────

    pub fn add_function_void(
        &self,
        name: &str,
        requirement: Requirement,
    ) -> Result<FunctionVoid, ConduitError> {
        let slot: Arc<Slot<dyn VoidCommand>> = Arc::new(Slot::empty());
        self.insert_function(
            name,
            Box::new(Binding {
                kind: SignatureKind::Void,
                requirement,
                argument_type: None,
                slot: Arc::clone(&slot),
                wrap: queued_void,
            }),
        )?;
        Ok(FunctionVoid::new(name, slot))
    }

    pub fn add_function_read<T>(
        &self,
        name: &str,
        requirement: Requirement,
    ) -> Result<FunctionRead<T>, ConduitError>
    where
        T: 'static,
    {
        let slot: Arc<Slot<dyn ReadCommand<T>>> = Arc::new(Slot::empty());
        self.insert_function(
            name,
            Box::new(Binding {
                kind: SignatureKind::Read,
                requirement,
                argument_type: Some(type_name::<T>()),
                slot: Arc::clone(&slot),
                wrap: direct::<dyn ReadCommand<T>>,
            }),
        )?;
        Ok(FunctionRead::new(name, slot))
    }

    pub fn add_function_write<T>(
        &self,
        name: &str,
        requirement: Requirement,
    ) -> Result<FunctionWrite<T>, ConduitError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot: Arc<Slot<dyn WriteCommand<T>>> = Arc::new(Slot::empty());
        self.insert_function(
            name,
            Box::new(Binding {
                kind: SignatureKind::Write,
                requirement,
                argument_type: Some(type_name::<T>()),
                slot: Arc::clone(&slot),
                wrap: queued_write::<T>,
            }),
        )?;
        Ok(FunctionWrite::new(name, slot))
    }

    pub fn add_function_qualified_read<Q, T>(
        &self,
        name: &str,
        requirement: Requirement,
    ) -> Result<FunctionQualifiedRead<Q, T>, ConduitError>
    where
        Q: 'static,
        T: 'static,
    {
        let slot: Arc<Slot<dyn QualifiedReadCommand<Q, T>>> = Arc::new(Slot::empty());
        self.insert_function(
            name,
            Box::new(Binding {
                kind: SignatureKind::QualifiedRead,
                requirement,
                argument_type: Some(type_name::<(Q, T)>()),
                slot: Arc::clone(&slot),
                wrap: direct::<dyn QualifiedReadCommand<Q, T>>,
            }),
        )?;
        Ok(FunctionQualifiedRead::new(name, slot))
    }

    fn insert_function(
        &self,
        name: &str,
        binding: Box<dyn SlotBinding>,
    ) -> Result<(), ConduitError> {
        let mut functions = self.functions.write().unwrap_or_else(PoisonError::into_inner);
        if functions.contains_key(name) {
            warn!(interface = %self.name, function = name, "duplicate function name rejected");
            return Err(ConduitError::DuplicateName {
                kind: "function",
                name: name.to_string(),
            });
        }
        debug!(interface = %self.name, function = name, kind = %binding.kind(), "function added");
        functions.insert(name.to_string(), binding);
        Ok(())
    }

    // ── Event handlers ───────────────────────────────────────────────────────

    /// Register a handler for the provider's Void event `name`.
    ///
    /// # Errors
    ///
    /// [`ConduitError::NoMailbox`] for a queued handler on an interface
    /// created without a mailbox; [`ConduitError::DuplicateName`] if a
    /// handler for `name` exists.
    pub fn add_event_handler_void(
        &self,
        name: &str,
        handler: impl Fn() + Send + Sync + 'static,
        delivery: EventDelivery,
    ) -> Result<(), ConduitError> {
        let binding: Box<dyn HandlerBinding> = match delivery {
            EventDelivery::Direct => {
                let command = Arc::new(VoidFn::new(name, handler));
                let control: Arc<dyn Command> = command.clone();
                Box::new(VoidHandler {
                    delivery,
                    control,
                    command,
                })
            }
            EventDelivery::Queued => {
                let mailbox = self.event_mailbox(name)?;
                let actual: Arc<dyn VoidCommand> = Arc::new(VoidFn::new(name, handler));
                let command = Arc::new(QueuedVoid::new(actual, mailbox));
                let control: Arc<dyn Command> = command.clone();
                Box::new(VoidHandler {
                    delivery,
                    control,
                    command,
                })
            }
        };
        self.insert_handler(name, binding)
    }

    /// Register a handler for the provider's Write event `name`.
    pub fn add_event_handler_write<T>(
        &self,
        name: &str,
        handler: impl Fn(&T) + Send + Sync + 'static,
        delivery: EventDelivery,
    ) -> Result<(), ConduitError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let binding: Box<dyn HandlerBinding> = match delivery {
            EventDelivery::Direct => {
                let command = Arc::new(WriteFn::new(name, handler));
                let control: Arc<dyn Command> = command.clone();
                Box::new(WriteHandler::<T> {
                    delivery,
                    control,
                    command,
                })
            }
            EventDelivery::Queued => {
                let mailbox = self.event_mailbox(name)?;
                let actual: Arc<dyn WriteCommand<T>> = Arc::new(WriteFn::new(name, handler));
                let command = Arc::new(QueuedWrite::new(actual, mailbox));
                let control: Arc<dyn Command> = command.clone();
                Box::new(WriteHandler::<T> {
                    delivery,
                    control,
                    command,
                })
            }
        };
        self.insert_handler(name, binding)
    }

    fn event_mailbox(&self, handler: &str) -> Result<Arc<Mailbox>, ConduitError> {
        match &self.mailbox {
            Some(mailbox) => Ok(Arc::clone(mailbox)),
            None => {
                warn!(interface = %self.name, handler, "queued event handler needs a mailbox");
                Err(ConduitError::NoMailbox {
                    interface: self.name.clone(),
                    handler: handler.to_string(),
                })
            }
        }
    }

    fn insert_handler(
        &self,
        name: &str,
        binding: Box<dyn HandlerBinding>,
    ) -> Result<(), ConduitError> {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(name) {
            warn!(interface = %self.name, event = name, "duplicate event handler rejected");
            return Err(ConduitError::DuplicateName {
                kind: "event handler",
                name: name.to_string(),
            });
        }
        debug!(
            interface = %self.name,
            event = name,
            kind = %binding.kind(),
            delivery = ?binding.delivery(),
            "event handler added"
        );
        handlers.insert(name.to_string(), binding);
        Ok(())
    }

    /// Enable every event handler.
    pub fn enable_all_events(&self) {
        for handler in self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            handler.control().enable();
        }
    }

    /// Disable every event handler; raised events are ignored (and not
    /// queued) until re-enabled.
    pub fn disable_all_events(&self) {
        for handler in self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            handler.control().disable();
        }
    }

    // ── Connection ───────────────────────────────────────────────────────────

    /// Bind every function and attach every event handler to `provided`.
    ///
    /// # Errors
    ///
    /// * [`ConduitError::AlreadyConnected`] – disconnect first.
    /// * [`ConduitError::Bind`] – at least one required function has no
    ///   match; nothing stays bound.
    pub fn connect(&self, provided: &Arc<ProvidedInterface>) -> Result<(), ConduitError> {
        let mut connection = self.lock_connection();
        if connection.is_some() {
            return Err(ConduitError::AlreadyConnected {
                interface: self.label(),
            });
        }

        let endpoint = provided.allocate_endpoint(&self.label());
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        let mut missing = Vec::new();
        for (name, binding) in functions.iter() {
            match binding.bind(name, provided, endpoint.as_ref()) {
                Ok(()) => debug!(interface = %self.name, function = %name, "function bound"),
                Err(miss) => {
                    binding.clear();
                    match binding.requirement() {
                        Requirement::Required => {
                            warn!(interface = %self.name, function = %name, reason = %miss, "required function not matched");
                            missing.push(name.clone());
                        }
                        Requirement::Optional => {
                            debug!(interface = %self.name, function = %name, reason = %miss, "optional function left unbound");
                        }
                    }
                }
            }
        }

        if !missing.is_empty() {
            for binding in functions.values() {
                binding.clear();
            }
            if let Some(endpoint) = &endpoint {
                provided.retire_endpoint(endpoint);
            }
            return Err(ConduitError::Bind {
                interface: self.label(),
                missing,
            });
        }
        drop(functions);

        let mut detachers = Vec::new();
        for (name, handler) in self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            match handler.attach(name, provided) {
                Some(detach) => detachers.push(detach),
                None => warn!(
                    interface = %self.name,
                    event = %name,
                    provider = %provided.name(),
                    "provider does not raise this event, handler not attached"
                ),
            }
        }

        provided.connection_added();
        info!(
            required = %self.label(),
            provided = %format!("{}.{}", provided.owner(), provided.name()),
            "interfaces connected"
        );
        *connection = Some(Connection {
            provided: Arc::clone(provided),
            endpoint,
            detachers,
        });
        Ok(())
    }

    /// Empty all slots and detach all event handlers.
    ///
    /// # Errors
    ///
    /// [`ConduitError::NotConnected`] if there is nothing to disconnect.
    pub fn disconnect(&self) -> Result<(), ConduitError> {
        let Some(connection) = self.lock_connection().take() else {
            return Err(ConduitError::NotConnected {
                interface: self.label(),
            });
        };
        for binding in self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            binding.clear();
        }
        for detach in connection.detachers {
            detach();
        }
        if let Some(endpoint) = &connection.endpoint {
            connection.provided.retire_endpoint(endpoint);
        }
        connection.provided.connection_removed();
        info!(required = %self.label(), "interfaces disconnected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.lock_connection().is_some()
    }

    /// `"component.interface"` of the connected provided interface.
    pub fn connected_to(&self) -> Option<String> {
        self.lock_connection()
            .as_ref()
            .map(|c| format!("{}.{}", c.provided.owner(), c.provided.name()))
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    // ── Mailbox ──────────────────────────────────────────────────────────────

    /// Run every queued event handler invocation.  Owner thread only.
    pub fn process_mailboxes(&self) -> Result<usize, ConduitError> {
        match &self.mailbox {
            Some(mailbox) => mailbox.drain(),
            None => Ok(0),
        }
    }

    /// Event invocations dropped since the previous call.
    pub fn take_unreported_drops(&self) -> u64 {
        self.mailbox
            .as_ref()
            .map_or(0, |mailbox| mailbox.take_unreported_drops())
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Names of the function slots with signature `kind`, in name order.
    pub fn names_of_functions(&self, kind: SignatureKind) -> Vec<String> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, binding)| binding.kind() == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names of the event handlers with signature `kind`, in name order.
    pub fn names_of_event_handlers(&self, kind: SignatureKind) -> Vec<String> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, handler)| handler.kind() == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn description(&self) -> RequiredDescription {
        let functions = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, binding)| FunctionDescription {
                name: name.clone(),
                kind: binding.kind(),
                argument_type: binding.argument_type().map(str::to_string),
                requirement: binding.requirement(),
                bound: binding.is_bound(),
            })
            .collect();
        let event_handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, handler)| EventHandlerDescription {
                name: name.clone(),
                kind: handler.kind(),
                delivery: handler.delivery(),
                enabled: handler.control().is_enabled(),
            })
            .collect();
        RequiredDescription {
            owner: self.owner.clone(),
            name: self.name.clone(),
            connected_to: self.connected_to(),
            queued_events: self.has_mailbox(),
            functions,
            event_handlers,
        }
    }
}

impl fmt::Display for RequiredInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.description(), f)
    }
}

impl fmt::Debug for RequiredInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiredInterface")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("connected_to", &self.connected_to())
            .finish()
    }
}
