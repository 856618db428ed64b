//! [`Component`] – an independently scheduled unit with named interfaces.
//!
//! # Lifecycle
//!
//! | From | Operation | To |
//! |---|---|---|
//! | Constructed | [`create`](Component::create) | Created |
//! | Created, Stopped | [`start`](Component::start) | Running |
//! | Running | [`stop`](Component::stop) | Stopped |
//! | any | [`kill`](Component::kill) | Terminated |
//!
//! Periodic and continuous components own one OS thread, spawned by
//! `create` and parked until `start`.  Passive components own no thread;
//! whoever owns them calls [`run_cycle`](Component::run_cycle) or
//! [`process_queued_commands`](Component::process_queued_commands).
//!
//! # Run cycle
//!
//! 1. drain every provided-interface endpoint (queued commands);
//! 2. run the [`Task`] body;
//! 3. drain every required-interface mailbox (queued events).
//!
//! A corrupted mailbox aborts the cycle and terminates this component only.
//!
//! Termination is advisory: [`kill`](Component::kill) raises a flag that
//! the thread checks at the top of each cycle and while it waits, so
//! commands already executing always complete.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use conduit_interface::{
    InputInterface, InterfaceDescription, OutputInterface, ProvidedInterface, ProvidedOrOutput,
    RequiredInterface, RequiredOrInput,
};
use conduit_middleware::LifecycleBus;
use conduit_types::{
    ComponentState, ConduitError, DEFAULT_MAILBOX_CAPACITY, LifecycleEvent, LifecyclePayload,
    QueuingPolicy,
};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::watchdog::Watchdog;

// ─────────────────────────────────────────────────────────────────────────────
// Kind & task
// ─────────────────────────────────────────────────────────────────────────────

/// How a component is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// No thread; driven by its owner.
    Passive,
    /// One thread, one cycle every period.
    Periodic(Duration),
    /// One thread, cycles back to back.
    Continuous,
}

impl ComponentKind {
    pub fn is_active(self) -> bool {
        !matches!(self, ComponentKind::Passive)
    }

    pub fn period(self) -> Option<Duration> {
        match self {
            ComponentKind::Periodic(period) => Some(period),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Passive => f.write_str("passive"),
            ComponentKind::Periodic(period) => write!(f, "periodic ({period:?})"),
            ComponentKind::Continuous => f.write_str("continuous"),
        }
    }
}

/// User body of a component.
///
/// `startup` runs once before the first cycle, `run` once per cycle and
/// `cleanup` once after the last, all on the component's thread (or on the
/// caller's thread for passive components).
pub trait Task: Send {
    fn startup(&mut self) {}

    fn run(&mut self);

    fn cleanup(&mut self) {}
}

struct BodyTask<F>(F);

impl<F> Task for BodyTask<F>
where
    F: FnMut() + Send,
{
    fn run(&mut self) {
        (self.0)()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

struct Monitor {
    bus: LifecycleBus,
    watchdog: Arc<Watchdog>,
}

/// Named component: interfaces, a task, and a lifecycle state machine.
pub struct Component {
    name: String,
    kind: ComponentKind,
    mailbox_capacity: usize,
    provided: RwLock<BTreeMap<String, ProvidedOrOutput>>,
    required: RwLock<BTreeMap<String, RequiredOrInput>>,
    task: Mutex<Option<Box<dyn Task>>>,
    task_started: AtomicBool,
    state: Mutex<ComponentState>,
    state_changed: Condvar,
    kill_requested: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
    monitor: RwLock<Option<Monitor>>,
}

impl Component {
    /// A new component in the `Constructed` state with no interfaces.
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            provided: RwLock::new(BTreeMap::new()),
            required: RwLock::new(BTreeMap::new()),
            task: Mutex::new(None),
            task_started: AtomicBool::new(false),
            state: Mutex::new(ComponentState::Constructed),
            state_changed: Condvar::new(),
            kill_requested: AtomicBool::new(false),
            thread: Mutex::new(None),
            monitor: RwLock::new(None),
        }
    }

    /// Capacity of mailboxes created by the `add_interface_*` methods.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn state(&self) -> ComponentState {
        *self.lock_state()
    }

    /// Install the component body.  Only allowed before `create`.
    pub fn set_task(&self, task: impl Task + 'static) -> Result<(), ConduitError> {
        let state = self.lock_state();
        if *state != ComponentState::Constructed {
            return Err(ConduitError::Config(format!(
                "task of component \"{}\" can only be set before create",
                self.name
            )));
        }
        *self.lock_task() = Some(Box::new(task));
        Ok(())
    }

    /// Install a closure as the component body.
    pub fn set_body(&self, body: impl FnMut() + Send + 'static) -> Result<(), ConduitError> {
        self.set_task(BodyTask(body))
    }

    /// Report state changes, faults and overflow on `bus` and heartbeat
    /// into `watchdog` while running.
    pub fn attach_monitor(&self, bus: LifecycleBus, watchdog: Arc<Watchdog>) {
        *self.monitor.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Monitor { bus, watchdog });
    }

    // ── Interfaces ───────────────────────────────────────────────────────────

    /// Add a provided interface using the component's mailbox capacity.
    ///
    /// A passive component asking for queued commands is warned: nothing
    /// drains its endpoints unless the owner calls
    /// [`process_queued_commands`](Component::process_queued_commands).
    pub fn add_interface_provided(
        &self,
        name: &str,
        policy: QueuingPolicy,
    ) -> Result<Arc<ProvidedInterface>, ConduitError> {
        self.add_interface_provided_with_capacity(name, policy, self.mailbox_capacity)
    }

    pub fn add_interface_provided_with_capacity(
        &self,
        name: &str,
        policy: QueuingPolicy,
        mailbox_capacity: usize,
    ) -> Result<Arc<ProvidedInterface>, ConduitError> {
        if !self.kind.is_active() && policy == QueuingPolicy::CommandsQueued {
            warn!(
                component = %self.name,
                interface = name,
                "passive component with queued commands must process them manually"
            );
        }
        let interface = Arc::new(ProvidedInterface::new(
            self.name.as_str(),
            name,
            policy,
            mailbox_capacity,
        ));
        self.insert_provided(name, ProvidedOrOutput::Provided(Arc::clone(&interface)))?;
        Ok(interface)
    }

    pub fn add_interface_output(&self, name: &str) -> Result<Arc<OutputInterface>, ConduitError> {
        let interface = Arc::new(OutputInterface::new(self.name.as_str(), name));
        self.insert_provided(name, ProvidedOrOutput::Output(Arc::clone(&interface)))?;
        Ok(interface)
    }

    /// Add a required interface.  Active components get a mailbox for
    /// queued event handlers; passive components only accept direct ones.
    pub fn add_interface_required(&self, name: &str) -> Result<Arc<RequiredInterface>, ConduitError> {
        let capacity = self.kind.is_active().then_some(self.mailbox_capacity);
        self.add_interface_required_with_mailbox(name, capacity)
    }

    pub fn add_interface_required_with_mailbox(
        &self,
        name: &str,
        event_mailbox_capacity: Option<usize>,
    ) -> Result<Arc<RequiredInterface>, ConduitError> {
        let interface = Arc::new(RequiredInterface::new(
            self.name.as_str(),
            name,
            event_mailbox_capacity,
        ));
        self.insert_required(name, RequiredOrInput::Required(Arc::clone(&interface)))?;
        Ok(interface)
    }

    pub fn add_interface_input(&self, name: &str) -> Result<Arc<InputInterface>, ConduitError> {
        let interface = Arc::new(InputInterface::new(self.name.as_str(), name));
        self.insert_required(name, RequiredOrInput::Input(Arc::clone(&interface)))?;
        Ok(interface)
    }

    fn insert_provided(&self, name: &str, interface: ProvidedOrOutput) -> Result<(), ConduitError> {
        let mut provided = self.provided.write().unwrap_or_else(PoisonError::into_inner);
        if provided.contains_key(name) {
            warn!(component = %self.name, interface = name, "duplicate provided interface rejected");
            return Err(ConduitError::DuplicateName {
                kind: "provided interface",
                name: name.to_string(),
            });
        }
        debug!(component = %self.name, interface = name, "provided interface added");
        provided.insert(name.to_string(), interface);
        Ok(())
    }

    fn insert_required(&self, name: &str, interface: RequiredOrInput) -> Result<(), ConduitError> {
        let mut required = self.required.write().unwrap_or_else(PoisonError::into_inner);
        if required.contains_key(name) {
            warn!(component = %self.name, interface = name, "duplicate required interface rejected");
            return Err(ConduitError::DuplicateName {
                kind: "required interface",
                name: name.to_string(),
            });
        }
        debug!(component = %self.name, interface = name, "required interface added");
        required.insert(name.to_string(), interface);
        Ok(())
    }

    pub fn interface_provided_or_output(&self, name: &str) -> Option<ProvidedOrOutput> {
        self.provided
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn interface_required_or_input(&self, name: &str) -> Option<RequiredOrInput> {
        self.required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn interface_provided(&self, name: &str) -> Option<Arc<ProvidedInterface>> {
        self.interface_provided_or_output(name)?.as_provided().cloned()
    }

    pub fn interface_output(&self, name: &str) -> Option<Arc<OutputInterface>> {
        self.interface_provided_or_output(name)?.as_output().cloned()
    }

    pub fn interface_required(&self, name: &str) -> Option<Arc<RequiredInterface>> {
        self.interface_required_or_input(name)?.as_required().cloned()
    }

    pub fn interface_input(&self, name: &str) -> Option<Arc<InputInterface>> {
        self.interface_required_or_input(name)?.as_input().cloned()
    }

    /// Remove a provided or output interface.
    ///
    /// # Errors
    ///
    /// [`ConduitError::InterfaceInUse`] while any required interface or
    /// input is connected to it; [`ConduitError::NotFound`] for an unknown
    /// name.
    pub fn remove_interface_provided(&self, name: &str) -> Result<(), ConduitError> {
        let mut provided = self.provided.write().unwrap_or_else(PoisonError::into_inner);
        let connections = provided
            .get(name)
            .ok_or_else(|| ConduitError::NotFound {
                kind: "provided interface",
                name: name.to_string(),
            })?
            .connection_count();
        if connections > 0 {
            warn!(component = %self.name, interface = name, connections, "cannot remove connected interface");
            return Err(ConduitError::InterfaceInUse {
                interface: format!("{}.{}", self.name, name),
                connections,
            });
        }
        provided.remove(name);
        info!(component = %self.name, interface = name, "provided interface removed");
        Ok(())
    }

    /// Remove a required or input interface; rejected while connected.
    pub fn remove_interface_required(&self, name: &str) -> Result<(), ConduitError> {
        let mut required = self.required.write().unwrap_or_else(PoisonError::into_inner);
        let connected = required
            .get(name)
            .ok_or_else(|| ConduitError::NotFound {
                kind: "required interface",
                name: name.to_string(),
            })?
            .is_connected();
        if connected {
            warn!(component = %self.name, interface = name, "cannot remove connected interface");
            return Err(ConduitError::InterfaceInUse {
                interface: format!("{}.{}", self.name, name),
                connections: 1,
            });
        }
        required.remove(name);
        info!(component = %self.name, interface = name, "required interface removed");
        Ok(())
    }

    /// Live connections across all interfaces: consumers attached to each
    /// provided or output interface plus each connected required or input.
    pub fn connection_count(&self) -> usize {
        let served: usize = self
            .provided
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(ProvidedOrOutput::connection_count)
            .sum();
        let using = self
            .required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|i| i.is_connected())
            .count();
        served + using
    }

    /// Names of provided and output interfaces, in name order.
    pub fn names_of_interfaces_provided_or_output(&self) -> Vec<String> {
        self.provided
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Names of required and input interfaces, in name order.
    pub fn names_of_interfaces_required_or_input(&self) -> Vec<String> {
        self.required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn provided_interfaces(&self) -> Vec<Arc<ProvidedInterface>> {
        self.provided
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|i| i.as_provided().cloned())
            .collect()
    }

    fn required_interfaces(&self) -> Vec<Arc<RequiredInterface>> {
        self.required
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(|i| i.as_required().cloned())
            .collect()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Constructed → Created.  Active components spawn their thread here; it
    /// stays parked until [`start`](Component::start).
    pub fn create(self: &Arc<Self>) -> Result<(), ConduitError> {
        self.transition(&[ComponentState::Constructed], ComponentState::Created)?;
        if !self.kind.is_active() {
            return Ok(());
        }
        let component = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || component.thread_main());
        match spawned {
            Ok(handle) => {
                *self.lock_thread() = Some(handle);
                Ok(())
            }
            Err(e) => {
                error!(component = %self.name, error = %e, "failed to spawn component thread");
                self.mark_terminated();
                Err(ConduitError::Thread(format!("{}: {e}", self.name)))
            }
        }
    }

    /// Created or Stopped → Running.
    pub fn start(&self) -> Result<(), ConduitError> {
        let from = self.transition(
            &[ComponentState::Created, ComponentState::Stopped],
            ComponentState::Running,
        )?;
        if self.kind.is_active() {
            self.with_monitor(|m| {
                m.watchdog
                    .register(&self.name, m.watchdog.timeout_for(self.kind.period()))
            });
        } else if from == ComponentState::Created {
            self.run_startup();
        }
        Ok(())
    }

    /// Running → Stopped.  The thread idles until started again or killed.
    pub fn stop(&self) -> Result<(), ConduitError> {
        self.transition(&[ComponentState::Running], ComponentState::Stopped)?;
        self.with_monitor(|m| m.watchdog.unregister(&self.name));
        Ok(())
    }

    /// Request termination.
    ///
    /// Passive and never-created components terminate immediately; active
    /// components terminate once their thread observes the request (see
    /// [`wait_for_state`](Component::wait_for_state)).  Killing a terminated
    /// component is a no-op.
    pub fn kill(&self) {
        self.kill_requested.store(true, Ordering::Release);
        let state = self.state();
        match state {
            ComponentState::Terminated => {}
            ComponentState::Constructed => self.mark_terminated(),
            _ if !self.kind.is_active() => {
                self.run_cleanup();
                self.mark_terminated();
            }
            _ => {
                debug!(component = %self.name, %state, "kill requested");
                // Wake the thread wherever it waits; the lock orders this
                // notify after any predicate check in progress.
                let _guard = self.lock_state();
                self.state_changed.notify_all();
            }
        }
    }

    pub fn is_kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::Acquire)
    }

    /// Block until the component is in `state` or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`ConduitError::Timeout`] if `state` was not reached in time.
    pub fn wait_for_state(&self, state: ComponentState, timeout: Duration) -> Result<(), ConduitError> {
        let guard = self.lock_state();
        let (guard, _) = self
            .state_changed
            .wait_timeout_while(guard, timeout, |current| *current != state)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard == state {
            Ok(())
        } else {
            Err(ConduitError::Timeout {
                component: self.name.clone(),
                state,
            })
        }
    }

    /// Join the component thread, if any.  Call after the component has
    /// terminated.
    pub fn join(&self) -> Result<(), ConduitError> {
        let Some(handle) = self.lock_thread().take() else {
            return Ok(());
        };
        handle
            .join()
            .map_err(|_| ConduitError::Thread(format!("component \"{}\" panicked", self.name)))
    }

    // ── Cycle ────────────────────────────────────────────────────────────────

    /// One full cycle: queued commands, body, queued events.  A kill
    /// requested during the cycle runs the task's cleanup before returning.
    pub fn run_cycle(&self) -> Result<(), ConduitError> {
        self.process_queued_commands()?;
        if let Some(task) = self.lock_task().as_mut() {
            task.run();
        }
        let events = self.process_queued_events();
        if self.is_kill_requested() {
            self.run_cleanup();
        }
        events.map(|_| ())
    }

    /// Drain the endpoints of every provided interface.  Passive components
    /// with queued interfaces call this themselves.
    pub fn process_queued_commands(&self) -> Result<usize, ConduitError> {
        let mut executed = 0;
        for interface in self.provided_interfaces() {
            executed += interface.process_mailboxes()?;
        }
        Ok(executed)
    }

    /// Drain the event mailbox of every required interface.
    pub fn process_queued_events(&self) -> Result<usize, ConduitError> {
        let mut executed = 0;
        for interface in self.required_interfaces() {
            executed += interface.process_mailboxes()?;
        }
        Ok(executed)
    }

    fn thread_main(self: Arc<Self>) {
        debug!(component = %self.name, kind = %self.kind, "component thread waiting for start");
        if !self.wait_while(|state| state == ComponentState::Created) {
            self.mark_terminated();
            return;
        }
        self.run_startup();

        loop {
            if !self.wait_while(|state| state == ComponentState::Stopped) {
                break;
            }
            let cycle_start = Instant::now();
            if let Err(fault) = self.run_cycle() {
                error!(component = %self.name, error = %fault, "cycle fault, terminating component");
                self.publish(LifecyclePayload::CycleFault {
                    message: fault.to_string(),
                });
                break;
            }
            self.after_cycle();

            match self.kind {
                ComponentKind::Periodic(period) => {
                    let elapsed = cycle_start.elapsed();
                    if elapsed > period {
                        trace!(component = %self.name, ?elapsed, ?period, "cycle overran its period");
                    }
                    if !self.sleep_until(cycle_start + period) {
                        break;
                    }
                }
                ComponentKind::Continuous => thread::yield_now(),
                ComponentKind::Passive => {}
            }
        }

        self.run_cleanup();
        self.mark_terminated();
    }

    /// Wait while `parked(state)` holds.  Returns `false` once a kill has
    /// been requested.
    fn wait_while(&self, parked: impl Fn(ComponentState) -> bool) -> bool {
        let guard = self.lock_state();
        let _guard = self
            .state_changed
            .wait_while(guard, |state| parked(*state) && !self.is_kill_requested())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_kill_requested()
    }

    /// Sleep until `deadline` unless killed first.  Returns `false` on kill.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let guard = self.lock_state();
        let _guard = self
            .state_changed
            .wait_timeout_while(guard, remaining, |_| !self.is_kill_requested())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_kill_requested()
    }

    fn after_cycle(&self) {
        self.with_monitor(|m| m.watchdog.heartbeat(&self.name));
        for interface in self.provided_interfaces() {
            self.report_drops(interface.name(), interface.take_unreported_drops());
        }
        for interface in self.required_interfaces() {
            self.report_drops(interface.name(), interface.take_unreported_drops());
        }
    }

    fn report_drops(&self, interface: &str, dropped: u64) {
        if dropped > 0 {
            self.publish(LifecyclePayload::MailboxOverflow {
                interface: interface.to_string(),
                dropped,
            });
        }
    }

    fn run_startup(&self) {
        if let Some(task) = self.lock_task().as_mut() {
            task.startup();
        }
        self.task_started.store(true, Ordering::Release);
    }

    /// Run the task's `cleanup` once.  If the task is mid-`run` (a body
    /// killing its own component), cleanup is left to the end of that
    /// cycle.
    fn run_cleanup(&self) {
        if !self.task_started.load(Ordering::Acquire) {
            return;
        }
        let mut task = match self.task.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!(component = %self.name, "task busy, cleanup deferred to end of cycle");
                return;
            }
        };
        if self.task_started.swap(false, Ordering::AcqRel) {
            if let Some(task) = task.as_mut() {
                task.cleanup();
            }
        }
    }

    // ── State plumbing ───────────────────────────────────────────────────────

    fn transition(
        &self,
        allowed: &[ComponentState],
        to: ComponentState,
    ) -> Result<ComponentState, ConduitError> {
        let mut state = self.lock_state();
        let from = *state;
        if !allowed.contains(&from) || (to != ComponentState::Terminated && self.is_kill_requested()) {
            return Err(ConduitError::InvalidTransition {
                component: self.name.clone(),
                from,
                to,
            });
        }
        *state = to;
        drop(state);
        self.state_changed.notify_all();
        self.announce(from, to);
        Ok(from)
    }

    fn mark_terminated(&self) {
        let mut state = self.lock_state();
        let from = *state;
        if from == ComponentState::Terminated {
            return;
        }
        *state = ComponentState::Terminated;
        drop(state);
        self.state_changed.notify_all();
        self.with_monitor(|m| m.watchdog.unregister(&self.name));
        self.announce(from, ComponentState::Terminated);
    }

    fn announce(&self, from: ComponentState, to: ComponentState) {
        info!(component = %self.name, %from, %to, "component state changed");
        self.publish(LifecyclePayload::StateChanged { from, to });
    }

    fn publish(&self, payload: LifecyclePayload) {
        self.with_monitor(|m| {
            m.bus.publish(LifecycleEvent::new(self.name.as_str(), payload));
        });
    }

    fn with_monitor(&self, f: impl FnOnce(&Monitor)) {
        if let Some(monitor) = self
            .monitor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            f(monitor);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ComponentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<Box<dyn Task>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_thread(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// One line of the system graph:
    /// `add taskA [[name],[required...],[provided...]]`.
    pub fn to_graph_format(&self) -> String {
        format!(
            "add taskA [[{}],[{}],[{}]]\n",
            self.name,
            self.names_of_interfaces_required_or_input().join(","),
            self.names_of_interfaces_provided_or_output().join(",")
        )
    }

    pub fn description(&self) -> ComponentDescription {
        ComponentDescription {
            name: self.name.clone(),
            kind: self.kind.to_string(),
            state: self.state(),
            provided: self
                .provided
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .map(ProvidedOrOutput::description)
                .collect(),
            required: self
                .required
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .values()
                .map(RequiredOrInput::description)
                .collect(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.description(), f)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

/// Serialisable snapshot of a component and its interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentDescription {
    pub name: String,
    pub kind: String,
    pub state: ComponentState,
    pub provided: Vec<InterfaceDescription>,
    pub required: Vec<InterfaceDescription>,
}

impl fmt::Display for ComponentDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "component \"{}\" ({}, {})", self.name, self.kind, self.state)?;
        for interface in self.provided.iter().chain(&self.required) {
            write!(f, "{interface}")?;
        }
        Ok(())
    }
}
