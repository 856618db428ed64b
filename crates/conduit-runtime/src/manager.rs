//! [`ComponentManager`] – registry, wiring and lifecycle of a component
//! system.
//!
//! One manager value is constructed at startup and passed by reference to
//! whatever needs it.  It owns the [`LifecycleBus`] and [`Watchdog`] shared
//! by every component it manages.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use conduit_kernel::ComponentKind;
//! use conduit_runtime::{ComponentManager, ManagerConfig};
//! use conduit_types::{QueuingPolicy, Requirement};
//!
//! let manager = ComponentManager::new(ManagerConfig::default());
//!
//! let robot = manager.new_component("Robot", ComponentKind::Periodic(Duration::from_millis(5)));
//! robot
//!     .add_interface_provided("Control", QueuingPolicy::CommandsQueued)
//!     .unwrap()
//!     .add_command_void("Home", || {})
//!     .unwrap();
//! manager.add_component(robot).unwrap();
//!
//! let controller = manager.new_component("Controller", ComponentKind::Passive);
//! controller
//!     .add_interface_required("Motor")
//!     .unwrap()
//!     .add_function_void("Home", Requirement::Required)
//!     .unwrap();
//! manager.add_component(controller).unwrap();
//!
//! manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
//! manager.create_all().unwrap();
//! manager.start_all().unwrap();
//! manager.kill_all().unwrap();
//! manager.cleanup().unwrap();
//! ```

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use conduit_interface::{ProvidedOrOutput, RequiredOrInput};
use conduit_kernel::{Component, ComponentDescription, ComponentKind, Watchdog};
use conduit_middleware::{LifecycleBus, LifecycleReceiver, LifecycleTopic};
use conduit_types::{ComponentState, ConduitError, LifecycleEvent, LifecyclePayload};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::ManagerConfig;

/// One established connection, by names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    pub client_component: String,
    pub client_interface: String,
    pub server_component: String,
    pub server_interface: String,
}

impl ConnectionRecord {
    fn matches(&self, client: &str, required: &str, server: &str, provided: &str) -> bool {
        self.client_component == client
            && self.client_interface == required
            && self.server_component == server
            && self.server_interface == provided
    }

    fn involves(&self, component: &str) -> bool {
        self.client_component == component || self.server_component == component
    }
}

/// Serialisable snapshot of the whole system.
#[derive(Debug, Clone, Serialize)]
pub struct SystemDescription {
    pub components: Vec<ComponentDescription>,
    pub connections: Vec<ConnectionRecord>,
}

/// Owns the components of one process and drives their lifecycle.
pub struct ComponentManager {
    config: ManagerConfig,
    /// In insertion order; lifecycle operations follow it.
    components: RwLock<Vec<Arc<Component>>>,
    connections: Mutex<Vec<ConnectionRecord>>,
    bus: LifecycleBus,
    watchdog: Arc<Watchdog>,
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl ComponentManager {
    pub fn new(config: ManagerConfig) -> Self {
        let watchdog = Arc::new(Watchdog::with_policy(
            config.watchdog_timeout_factor,
            config.watchdog_min_timeout(),
        ));
        Self {
            bus: LifecycleBus::new(config.bus_capacity),
            watchdog,
            config,
            components: RwLock::new(Vec::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn bus(&self) -> &LifecycleBus {
        &self.bus
    }

    pub fn watchdog(&self) -> &Arc<Watchdog> {
        &self.watchdog
    }

    pub fn subscribe(&self) -> LifecycleReceiver {
        self.bus.subscribe()
    }

    pub fn subscribe_to(&self, topic: LifecycleTopic) -> LifecycleReceiver {
        self.bus.subscribe_to(topic)
    }

    // ── Registry ─────────────────────────────────────────────────────────────

    /// Take ownership of `component` and attach the manager's bus and
    /// watchdog to it.
    ///
    /// # Errors
    ///
    /// [`ConduitError::DuplicateName`] if a component with the same name is
    /// already managed.
    pub fn add_component(
        &self,
        component: impl Into<Arc<Component>>,
    ) -> Result<Arc<Component>, ConduitError> {
        let component = component.into();
        let mut components = self.write_components();
        if components.iter().any(|c| c.name() == component.name()) {
            warn!(component = %component.name(), "duplicate component rejected");
            return Err(ConduitError::DuplicateName {
                kind: "component",
                name: component.name().to_string(),
            });
        }
        component.attach_monitor(self.bus.clone(), Arc::clone(&self.watchdog));
        info!(component = %component.name(), kind = %component.kind(), "component added");
        components.push(Arc::clone(&component));
        Ok(component)
    }

    /// A `Constructed` component whose mailboxes use the configured
    /// `mailbox_capacity`.  Add interfaces to it, then hand it to
    /// [`add_component`](ComponentManager::add_component).
    pub fn new_component(&self, name: impl Into<String>, kind: ComponentKind) -> Component {
        Component::new(name, kind).with_mailbox_capacity(self.config.mailbox_capacity)
    }

    pub fn component(&self, name: &str) -> Option<Arc<Component>> {
        self.read_components()
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Names of managed components, in insertion order.
    pub fn names_of_components(&self) -> Vec<String> {
        self.read_components()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Remove a component that is not running and has no connections.
    pub fn remove_component(&self, name: &str) -> Result<Arc<Component>, ConduitError> {
        let component = self.require_component(name)?;
        let recorded = self
            .lock_connections()
            .iter()
            .filter(|c| c.involves(name))
            .count();
        let connections = recorded.max(component.connection_count());
        if connections > 0 {
            return Err(ConduitError::InterfaceInUse {
                interface: name.to_string(),
                connections,
            });
        }
        let state = component.state();
        if !matches!(state, ComponentState::Constructed | ComponentState::Terminated) {
            return Err(ConduitError::InvalidTransition {
                component: name.to_string(),
                from: state,
                to: ComponentState::Terminated,
            });
        }
        self.write_components().retain(|c| c.name() != name);
        info!(component = name, "component removed");
        Ok(component)
    }

    fn require_component(&self, name: &str) -> Result<Arc<Component>, ConduitError> {
        self.component(name).ok_or_else(|| ConduitError::NotFound {
            kind: "component",
            name: name.to_string(),
        })
    }

    // ── Wiring ───────────────────────────────────────────────────────────────

    /// Connect `client.required` to `server.provided`, resolving both by
    /// name.  Works for required/provided and input/output pairs.
    pub fn connect(
        &self,
        client: &str,
        required: &str,
        server: &str,
        provided: &str,
    ) -> Result<(), ConduitError> {
        let (client_side, server_side) = self.resolve_pair(client, required, server, provided)?;
        match (&client_side, &server_side) {
            (RequiredOrInput::Required(r), ProvidedOrOutput::Provided(p)) => r.connect(p)?,
            (RequiredOrInput::Input(i), ProvidedOrOutput::Output(o)) => i.connect(o)?,
            (RequiredOrInput::Required(_), ProvidedOrOutput::Output(_)) => {
                return Err(ConduitError::NotFound {
                    kind: "provided interface",
                    name: format!("{server}.{provided}"),
                });
            }
            (RequiredOrInput::Input(_), ProvidedOrOutput::Provided(_)) => {
                return Err(ConduitError::NotFound {
                    kind: "output interface",
                    name: format!("{server}.{provided}"),
                });
            }
        }
        self.lock_connections().push(ConnectionRecord {
            client_component: client.to_string(),
            client_interface: required.to_string(),
            server_component: server.to_string(),
            server_interface: provided.to_string(),
        });
        Ok(())
    }

    /// Undo a [`connect`](ComponentManager::connect).
    pub fn disconnect(
        &self,
        client: &str,
        required: &str,
        server: &str,
        provided: &str,
    ) -> Result<(), ConduitError> {
        let position = self
            .lock_connections()
            .iter()
            .position(|c| c.matches(client, required, server, provided))
            .ok_or_else(|| ConduitError::NotConnected {
                interface: format!("{client}.{required}"),
            })?;
        let (client_side, server_side) = self.resolve_pair(client, required, server, provided)?;
        match (&client_side, &server_side) {
            (RequiredOrInput::Input(i), ProvidedOrOutput::Output(o)) => i.disconnect(o)?,
            (RequiredOrInput::Required(r), _) => r.disconnect()?,
            (RequiredOrInput::Input(_), ProvidedOrOutput::Provided(_)) => {
                return Err(ConduitError::NotConnected {
                    interface: format!("{client}.{required}"),
                });
            }
        }
        self.lock_connections().remove(position);
        Ok(())
    }

    fn resolve_pair(
        &self,
        client: &str,
        required: &str,
        server: &str,
        provided: &str,
    ) -> Result<(RequiredOrInput, ProvidedOrOutput), ConduitError> {
        let client_side = self
            .require_component(client)?
            .interface_required_or_input(required)
            .ok_or_else(|| ConduitError::NotFound {
                kind: "required interface",
                name: format!("{client}.{required}"),
            })?;
        let server_side = self
            .require_component(server)?
            .interface_provided_or_output(provided)
            .ok_or_else(|| ConduitError::NotFound {
                kind: "provided interface",
                name: format!("{server}.{provided}"),
            })?;
        Ok((client_side, server_side))
    }

    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.lock_connections().clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Create every component.  All are attempted; the first error is
    /// returned.
    pub fn create_all(&self) -> Result<(), ConduitError> {
        self.for_each("create", |c| c.create())
    }

    pub fn start_all(&self) -> Result<(), ConduitError> {
        self.for_each("start", |c| c.start())
    }

    pub fn stop_all(&self) -> Result<(), ConduitError> {
        self.for_each("stop", |c| c.stop())
    }

    /// Request termination of every component, then wait up to the
    /// configured kill timeout for each one to terminate.  Safe to call
    /// while components are mid-cycle, and from a signal handler thread.
    pub fn kill_all(&self) -> Result<(), ConduitError> {
        let components = self.snapshot();
        for component in &components {
            component.kill();
        }
        let timeout = self.config.kill_timeout();
        let mut first_error = None;
        for component in &components {
            if let Err(e) = component.wait_for_state(ComponentState::Terminated, timeout) {
                error!(component = %component.name(), error = %e, "component did not terminate");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Block until every component is in `state`.
    pub fn wait_for_state_all(
        &self,
        state: ComponentState,
        timeout: Duration,
    ) -> Result<(), ConduitError> {
        for component in self.snapshot() {
            component.wait_for_state(state, timeout)?;
        }
        Ok(())
    }

    /// Join every component thread and tear down recorded connections.
    /// Call after [`kill_all`](ComponentManager::kill_all).
    pub fn cleanup(&self) -> Result<(), ConduitError> {
        let result = self.for_each("join", |c| c.join());
        let records: Vec<ConnectionRecord> = self.lock_connections().drain(..).collect();
        for record in records {
            let Ok((client_side, server_side)) = self.resolve_pair(
                &record.client_component,
                &record.client_interface,
                &record.server_component,
                &record.server_interface,
            ) else {
                continue;
            };
            let outcome = match (&client_side, &server_side) {
                (RequiredOrInput::Required(r), _) => r.disconnect(),
                (RequiredOrInput::Input(i), ProvidedOrOutput::Output(o)) => i.disconnect(o),
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                warn!(error = %e, "disconnect during cleanup failed");
            }
        }
        info!("component system cleaned up");
        result
    }

    fn for_each(
        &self,
        operation: &str,
        f: impl Fn(&Arc<Component>) -> Result<(), ConduitError>,
    ) -> Result<(), ConduitError> {
        let mut first_error = None;
        for component in self.snapshot() {
            if let Err(e) = f(&component) {
                error!(component = %component.name(), operation, error = %e, "lifecycle operation failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ── Supervision ──────────────────────────────────────────────────────────

    /// Names of running components whose heartbeat deadline has passed.
    /// Each is reported once per call as `HeartbeatMissed` on the bus.
    pub fn check_health(&self) -> Vec<String> {
        let frozen = self.watchdog.check_all();
        for name in &frozen {
            warn!(component = %name, "heartbeat missed");
            self.bus
                .publish(LifecycleEvent::new(name.as_str(), LifecyclePayload::HeartbeatMissed));
        }
        frozen
    }

    // ── Introspection ────────────────────────────────────────────────────────

    /// Graph of the whole system: one `add` line per component, then one
    /// `connect` line per connection.
    pub fn graph_format(&self) -> String {
        let mut graph = String::new();
        for component in self.snapshot() {
            graph.push_str(&component.to_graph_format());
        }
        for c in self.lock_connections().iter() {
            let _ = writeln!(
                graph,
                "connect [[{}],[{}]] [[{}],[{}]]",
                c.client_component, c.client_interface, c.server_component, c.server_interface
            );
        }
        graph
    }

    pub fn description(&self) -> SystemDescription {
        SystemDescription {
            components: self.snapshot().iter().map(|c| c.description()).collect(),
            connections: self.connections(),
        }
    }

    /// [`description`](ComponentManager::description) as pretty JSON.
    pub fn description_json(&self) -> Result<String, ConduitError> {
        serde_json::to_string_pretty(&self.description())
            .map_err(|e| ConduitError::Config(format!("Failed to serialize description: {e}")))
    }

    // ── Locks ────────────────────────────────────────────────────────────────

    fn snapshot(&self) -> Vec<Arc<Component>> {
        self.read_components().clone()
    }

    fn read_components(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Component>>> {
        self.components.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_components(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Component>>> {
        self.components.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_connections(&self) -> MutexGuard<'_, Vec<ConnectionRecord>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::{ExecutionResult, QueuingPolicy, Requirement};

    fn wired_manager() -> ComponentManager {
        let manager = ComponentManager::default();

        let robot = Component::new("Robot", ComponentKind::Passive);
        let control = robot
            .add_interface_provided("Control", QueuingPolicy::CommandsNotQueued)
            .unwrap();
        control.add_command_write("SetSpeed", |_: &f64| {}).unwrap();
        robot.add_interface_output("Frames").unwrap();
        manager.add_component(robot).unwrap();

        let controller = Component::new("Controller", ComponentKind::Passive);
        controller
            .add_interface_required("Motor")
            .unwrap()
            .add_function_write::<f64>("SetSpeed", Requirement::Required)
            .unwrap();
        controller.add_interface_input("Video").unwrap();
        manager.add_component(controller).unwrap();

        manager
    }

    #[test]
    fn duplicate_component_rejected() {
        let manager = ComponentManager::default();
        manager
            .add_component(Component::new("Robot", ComponentKind::Passive))
            .unwrap();
        let err = manager
            .add_component(Component::new("Robot", ComponentKind::Passive))
            .unwrap_err();
        assert!(matches!(err, ConduitError::DuplicateName { kind: "component", .. }));
        assert_eq!(manager.names_of_components(), vec!["Robot"]);
    }

    #[test]
    fn connect_by_names_records_connection() {
        let manager = wired_manager();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
        manager.connect("Controller", "Video", "Robot", "Frames").unwrap();
        assert_eq!(manager.connections().len(), 2);

        let motor = manager
            .component("Controller")
            .and_then(|c| c.interface_required("Motor"))
            .unwrap();
        assert_eq!(motor.connected_to().as_deref(), Some("Robot.Control"));
    }

    #[test]
    fn connect_reports_unknown_names() {
        let manager = wired_manager();
        assert!(matches!(
            manager.connect("Nobody", "Motor", "Robot", "Control"),
            Err(ConduitError::NotFound { kind: "component", .. })
        ));
        assert!(matches!(
            manager.connect("Controller", "Arm", "Robot", "Control"),
            Err(ConduitError::NotFound { kind: "required interface", .. })
        ));
        assert!(matches!(
            manager.connect("Controller", "Motor", "Robot", "Frames"),
            Err(ConduitError::NotFound { kind: "provided interface", .. })
        ));
        assert!(manager.connections().is_empty());
    }

    #[test]
    fn failed_bind_is_not_recorded() {
        let manager = wired_manager();
        let other = Component::new("Other", ComponentKind::Passive);
        other
            .add_interface_provided("Control", QueuingPolicy::CommandsNotQueued)
            .unwrap();
        manager.add_component(other).unwrap();

        let err = manager
            .connect("Controller", "Motor", "Other", "Control")
            .unwrap_err();
        assert!(matches!(err, ConduitError::Bind { .. }));
        assert!(manager.connections().is_empty());
    }

    #[test]
    fn disconnect_removes_record() {
        let manager = wired_manager();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
        manager.disconnect("Controller", "Motor", "Robot", "Control").unwrap();
        assert!(manager.connections().is_empty());
        assert!(matches!(
            manager.disconnect("Controller", "Motor", "Robot", "Control"),
            Err(ConduitError::NotConnected { .. })
        ));
    }

    #[test]
    fn connected_component_cannot_be_removed() {
        let manager = wired_manager();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
        assert!(matches!(
            manager.remove_component("Robot"),
            Err(ConduitError::InterfaceInUse { .. })
        ));
        manager.disconnect("Controller", "Motor", "Robot", "Control").unwrap();
        manager.remove_component("Robot").unwrap();
        assert_eq!(manager.names_of_components(), vec!["Controller"]);
    }

    #[test]
    fn graph_lists_components_then_connections() {
        let manager = wired_manager();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
        assert_eq!(
            manager.graph_format(),
            "add taskA [[Robot],[],[Control,Frames]]\n\
             add taskA [[Controller],[Motor,Video],[]]\n\
             connect [[Controller],[Motor]] [[Robot],[Control]]\n"
        );
    }

    #[test]
    fn passive_lifecycle_publishes_state_changes() {
        let manager = wired_manager();
        let mut states = manager.subscribe_to(LifecycleTopic::StateChanges);

        manager.create_all().unwrap();
        manager.start_all().unwrap();
        manager.kill_all().unwrap();
        manager.cleanup().unwrap();

        let mut transitions = Vec::new();
        while let Some(event) = states.try_recv() {
            if let LifecyclePayload::StateChanged { to, .. } = event.payload {
                transitions.push((event.component, to));
            }
        }
        assert_eq!(transitions.len(), 6);
        assert_eq!(
            transitions[0],
            ("Robot".to_string(), ComponentState::Created)
        );
        assert!(transitions.contains(&("Controller".to_string(), ComponentState::Terminated)));
    }

    #[test]
    fn start_all_reports_invalid_transition() {
        let manager = wired_manager();
        assert!(matches!(
            manager.start_all(),
            Err(ConduitError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn description_json_contains_connections() {
        let manager = wired_manager();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();
        let json = manager.description_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["components"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["connections"][0]["server_interface"], "Control");
    }

    #[test]
    fn configured_mailbox_capacity_bounds_endpoints() {
        let manager = ComponentManager::new(ManagerConfig {
            mailbox_capacity: 2,
            ..ManagerConfig::default()
        });
        let robot = manager.new_component("Robot", ComponentKind::Periodic(Duration::from_millis(5)));
        robot
            .add_interface_provided("Control", QueuingPolicy::CommandsQueued)
            .unwrap()
            .add_command_void("Home", || {})
            .unwrap();
        manager.add_component(robot).unwrap();

        let controller = manager.new_component("Controller", ComponentKind::Passive);
        let home = controller
            .add_interface_required("Motor")
            .unwrap()
            .add_function_void("Home", Requirement::Required)
            .unwrap();
        manager.add_component(controller).unwrap();
        manager.connect("Controller", "Motor", "Robot", "Control").unwrap();

        assert_eq!(home.execute(), ExecutionResult::Ok);
        assert_eq!(home.execute(), ExecutionResult::Ok);
        assert_eq!(home.execute(), ExecutionResult::MailboxFull);
    }

    #[test]
    fn directly_connected_component_cannot_be_removed() {
        let manager = wired_manager();
        let motor = manager
            .component("Controller")
            .and_then(|c| c.interface_required("Motor"))
            .unwrap();
        let control = manager
            .component("Robot")
            .and_then(|c| c.interface_provided("Control"))
            .unwrap();
        motor.connect(&control).unwrap();
        assert!(manager.connections().is_empty());

        assert!(matches!(
            manager.remove_component("Robot"),
            Err(ConduitError::InterfaceInUse { connections: 1, .. })
        ));
        assert!(matches!(
            manager.remove_component("Controller"),
            Err(ConduitError::InterfaceInUse { .. })
        ));

        motor.disconnect().unwrap();
        manager.remove_component("Robot").unwrap();
    }
}
