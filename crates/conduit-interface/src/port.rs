//! Output/Input stream endpoints and the enum-tagged interface kinds.
//!
//! Output interfaces share the provided-interface namespace of a component
//! and input interfaces share the required-interface namespace, so lookups
//! return a [`ProvidedOrOutput`] / [`RequiredOrInput`] and callers pick the
//! variant they expect through the `as_*` accessors.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use conduit_types::ConduitError;
use tracing::info;

use crate::description::{InputDescription, InterfaceDescription, OutputDescription};
use crate::provided::ProvidedInterface;
use crate::required::RequiredInterface;

/// Producer end of a data stream.  Any number of inputs may follow it.
#[derive(Debug)]
pub struct OutputInterface {
    owner: String,
    name: String,
    consumers: Mutex<Vec<String>>,
}

impl OutputInterface {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            consumers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// `"component.interface"` of every connected input.
    pub fn consumers(&self) -> Vec<String> {
        self.lock_consumers().clone()
    }

    pub fn connection_count(&self) -> usize {
        self.lock_consumers().len()
    }

    fn lock_consumers(&self) -> MutexGuard<'_, Vec<String>> {
        self.consumers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn description(&self) -> OutputDescription {
        OutputDescription {
            owner: self.owner.clone(),
            name: self.name.clone(),
            consumers: self.consumers(),
        }
    }
}

/// Consumer end of a data stream; follows at most one output.
#[derive(Debug)]
pub struct InputInterface {
    owner: String,
    name: String,
    source: Mutex<Option<String>>,
}

impl InputInterface {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            source: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// `"component.interface"` of the output this input follows.
    pub fn source(&self) -> Option<String> {
        self.lock_source().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock_source().is_some()
    }

    /// Record `output` as this input's peer.
    pub fn connect(&self, output: &OutputInterface) -> Result<(), ConduitError> {
        let mut source = self.lock_source();
        if source.is_some() {
            return Err(ConduitError::AlreadyConnected {
                interface: self.label(),
            });
        }
        let peer = format!("{}.{}", output.owner, output.name);
        output.lock_consumers().push(self.label());
        info!(input = %self.label(), output = %peer, "stream connected");
        *source = Some(peer);
        Ok(())
    }

    /// Forget the peer recorded by [`InputInterface::connect`].
    ///
    /// # Errors
    ///
    /// [`ConduitError::NotConnected`] if this input does not follow
    /// `output`; the existing link, if any, is kept.
    pub fn disconnect(&self, output: &OutputInterface) -> Result<(), ConduitError> {
        let mut source = self.lock_source();
        let peer = format!("{}.{}", output.owner, output.name);
        if source.as_deref() != Some(peer.as_str()) {
            return Err(ConduitError::NotConnected {
                interface: self.label(),
            });
        }
        *source = None;
        let label = self.label();
        output.lock_consumers().retain(|c| *c != label);
        info!(input = %label, "stream disconnected");
        Ok(())
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<String>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn description(&self) -> InputDescription {
        InputDescription {
            owner: self.owner.clone(),
            name: self.name.clone(),
            source: self.source(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tagged kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Entry of a component's provided namespace.
#[derive(Debug, Clone)]
pub enum ProvidedOrOutput {
    Provided(Arc<ProvidedInterface>),
    Output(Arc<OutputInterface>),
}

impl ProvidedOrOutput {
    pub fn name(&self) -> &str {
        match self {
            ProvidedOrOutput::Provided(i) => i.name(),
            ProvidedOrOutput::Output(i) => i.name(),
        }
    }

    pub fn as_provided(&self) -> Option<&Arc<ProvidedInterface>> {
        match self {
            ProvidedOrOutput::Provided(i) => Some(i),
            ProvidedOrOutput::Output(_) => None,
        }
    }

    pub fn as_output(&self) -> Option<&Arc<OutputInterface>> {
        match self {
            ProvidedOrOutput::Output(i) => Some(i),
            ProvidedOrOutput::Provided(_) => None,
        }
    }

    /// Active connections; removal is refused while this is non-zero.
    pub fn connection_count(&self) -> usize {
        match self {
            ProvidedOrOutput::Provided(i) => i.connection_count(),
            ProvidedOrOutput::Output(i) => i.connection_count(),
        }
    }

    pub fn description(&self) -> InterfaceDescription {
        match self {
            ProvidedOrOutput::Provided(i) => InterfaceDescription::Provided(i.description()),
            ProvidedOrOutput::Output(i) => InterfaceDescription::Output(i.description()),
        }
    }
}

/// Entry of a component's required namespace.
#[derive(Debug, Clone)]
pub enum RequiredOrInput {
    Required(Arc<RequiredInterface>),
    Input(Arc<InputInterface>),
}

impl RequiredOrInput {
    pub fn name(&self) -> &str {
        match self {
            RequiredOrInput::Required(i) => i.name(),
            RequiredOrInput::Input(i) => i.name(),
        }
    }

    pub fn as_required(&self) -> Option<&Arc<RequiredInterface>> {
        match self {
            RequiredOrInput::Required(i) => Some(i),
            RequiredOrInput::Input(_) => None,
        }
    }

    pub fn as_input(&self) -> Option<&Arc<InputInterface>> {
        match self {
            RequiredOrInput::Input(i) => Some(i),
            RequiredOrInput::Required(_) => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            RequiredOrInput::Required(i) => i.is_connected(),
            RequiredOrInput::Input(i) => i.is_connected(),
        }
    }

    pub fn description(&self) -> InterfaceDescription {
        match self {
            RequiredOrInput::Required(i) => InterfaceDescription::Required(i.description()),
            RequiredOrInput::Input(i) => InterfaceDescription::Input(i.description()),
        }
    }
}

impl fmt::Display for ProvidedOrOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.description(), f)
    }
}

impl fmt::Display for RequiredOrInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.description(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::QueuingPolicy;

    #[test]
    fn input_records_its_output() {
        let output = OutputInterface::new("Camera", "Frames");
        let input = InputInterface::new("Viewer", "Frames");

        input.connect(&output).unwrap();
        assert_eq!(input.source().as_deref(), Some("Camera.Frames"));
        assert_eq!(output.consumers(), vec!["Viewer.Frames"]);
        assert!(matches!(
            input.connect(&output),
            Err(ConduitError::AlreadyConnected { .. })
        ));

        input.disconnect(&output).unwrap();
        assert!(!input.is_connected());
        assert_eq!(output.connection_count(), 0);
    }

    #[test]
    fn disconnect_from_other_output_keeps_link() {
        let camera = OutputInterface::new("Camera", "Frames");
        let lidar = OutputInterface::new("Lidar", "Frames");
        let input = InputInterface::new("Viewer", "Frames");
        input.connect(&camera).unwrap();

        assert!(matches!(
            input.disconnect(&lidar),
            Err(ConduitError::NotConnected { .. })
        ));
        assert_eq!(input.source().as_deref(), Some("Camera.Frames"));
        assert_eq!(camera.connection_count(), 1);

        input.disconnect(&camera).unwrap();
        assert!(matches!(
            input.disconnect(&camera),
            Err(ConduitError::NotConnected { .. })
        ));
    }

    #[test]
    fn tagged_accessors_pick_the_variant() {
        let provided = ProvidedOrOutput::Provided(Arc::new(ProvidedInterface::new(
            "Robot",
            "Control",
            QueuingPolicy::CommandsNotQueued,
            4,
        )));
        assert!(provided.as_provided().is_some());
        assert!(provided.as_output().is_none());
        assert_eq!(provided.name(), "Control");

        let input = RequiredOrInput::Input(Arc::new(InputInterface::new("Viewer", "Frames")));
        assert!(input.as_required().is_none());
        assert_eq!(input.as_input().map(|i| i.name()), Some("Frames"));
        assert!(matches!(input.description(), InterfaceDescription::Input(_)));
    }
}
