//! Serialisable snapshots of interfaces, for logs and external tooling.
//!
//! The `Display` impls produce the human-readable listing:
//!
//! ```text
//! provided "Robot.Control" (commands_queued, 1 connection)
//!   write SetSpeed <f64>
//!   event write SpeedChanged <f64> (1 handler)
//! required "Controller.Motor" (connected to Robot.Control)
//!   write SetSpeed <f64>: bound (required)
//!   handler write SpeedChanged: queued
//! ```

use std::fmt;

use conduit_types::{EventDelivery, QueuingPolicy, Requirement, SignatureKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescription {
    pub name: String,
    pub kind: SignatureKind,
    pub argument_type: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub name: String,
    pub kind: SignatureKind,
    pub argument_type: Option<String>,
    /// Handlers currently attached by connected required interfaces.
    pub handlers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidedDescription {
    pub owner: String,
    pub name: String,
    pub policy: QueuingPolicy,
    pub connections: usize,
    pub commands: Vec<CommandDescription>,
    pub events: Vec<EventDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescription {
    pub name: String,
    pub kind: SignatureKind,
    pub argument_type: Option<String>,
    pub requirement: Requirement,
    pub bound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandlerDescription {
    pub name: String,
    pub kind: SignatureKind,
    pub delivery: EventDelivery,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDescription {
    pub owner: String,
    pub name: String,
    /// `"component.interface"` of the connected provided interface.
    pub connected_to: Option<String>,
    pub queued_events: bool,
    pub functions: Vec<FunctionDescription>,
    pub event_handlers: Vec<EventHandlerDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescription {
    pub owner: String,
    pub name: String,
    pub consumers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescription {
    pub owner: String,
    pub name: String,
    pub source: Option<String>,
}

/// Any interface kind, tagged for JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "interface", rename_all = "snake_case")]
pub enum InterfaceDescription {
    Provided(ProvidedDescription),
    Required(RequiredDescription),
    Output(OutputDescription),
    Input(InputDescription),
}

// ─────────────────────────────────────────────────────────────────────────────
// Display
// ─────────────────────────────────────────────────────────────────────────────

fn argument_suffix(argument_type: &Option<String>) -> String {
    argument_type
        .as_deref()
        .map(|t| format!(" <{t}>"))
        .unwrap_or_default()
}

fn policy_label(policy: QueuingPolicy) -> &'static str {
    match policy {
        QueuingPolicy::CommandsQueued => "commands_queued",
        QueuingPolicy::CommandsNotQueued => "commands_not_queued",
    }
}

impl fmt::Display for ProvidedDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.connections == 1 { "" } else { "s" };
        writeln!(
            f,
            "provided \"{}.{}\" ({}, {} connection{plural})",
            self.owner,
            self.name,
            policy_label(self.policy),
            self.connections
        )?;
        for command in &self.commands {
            let disabled = if command.enabled { "" } else { " [disabled]" };
            writeln!(
                f,
                "  {} {}{}{disabled}",
                command.kind,
                command.name,
                argument_suffix(&command.argument_type)
            )?;
        }
        for event in &self.events {
            let plural = if event.handlers == 1 { "" } else { "s" };
            writeln!(
                f,
                "  event {} {}{} ({} handler{plural})",
                event.kind,
                event.name,
                argument_suffix(&event.argument_type),
                event.handlers
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for RequiredDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.connected_to {
            Some(peer) => writeln!(
                f,
                "required \"{}.{}\" (connected to {peer})",
                self.owner, self.name
            )?,
            None => writeln!(f, "required \"{}.{}\" (not connected)", self.owner, self.name)?,
        }
        for function in &self.functions {
            let state = if function.bound { "bound" } else { "unbound" };
            let requirement = match function.requirement {
                Requirement::Required => "required",
                Requirement::Optional => "optional",
            };
            writeln!(
                f,
                "  {} {}{}: {state} ({requirement})",
                function.kind,
                function.name,
                argument_suffix(&function.argument_type)
            )?;
        }
        for handler in &self.event_handlers {
            let delivery = match handler.delivery {
                EventDelivery::Queued => "queued",
                EventDelivery::Direct => "direct",
            };
            let disabled = if handler.enabled { "" } else { " [disabled]" };
            writeln!(
                f,
                "  handler {} {}: {delivery}{disabled}",
                handler.kind, handler.name
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for OutputDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "output \"{}.{}\" -> [{}]",
            self.owner,
            self.name,
            self.consumers.join(", ")
        )
    }
}

impl fmt::Display for InputDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "input \"{}.{}\" <- {}",
            self.owner,
            self.name,
            self.source.as_deref().unwrap_or("(none)")
        )
    }
}

impl fmt::Display for InterfaceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceDescription::Provided(d) => fmt::Display::fmt(d, f),
            InterfaceDescription::Required(d) => fmt::Display::fmt(d, f),
            InterfaceDescription::Output(d) => fmt::Display::fmt(d, f),
            InterfaceDescription::Input(d) => fmt::Display::fmt(d, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_required() -> RequiredDescription {
        RequiredDescription {
            owner: "Controller".to_string(),
            name: "Motor".to_string(),
            connected_to: None,
            queued_events: true,
            functions: vec![
                FunctionDescription {
                    name: "GetPosition".to_string(),
                    kind: SignatureKind::Read,
                    argument_type: Some("f64".to_string()),
                    requirement: Requirement::Optional,
                    bound: false,
                },
                FunctionDescription {
                    name: "SetSpeed".to_string(),
                    kind: SignatureKind::Write,
                    argument_type: Some("f64".to_string()),
                    requirement: Requirement::Required,
                    bound: false,
                },
            ],
            event_handlers: vec![],
        }
    }

    #[test]
    fn required_listing_shows_slot_status() {
        let text = sample_required().to_string();
        assert!(text.starts_with("required \"Controller.Motor\" (not connected)\n"));
        assert!(text.contains("  read GetPosition <f64>: unbound (optional)\n"));
        assert!(text.contains("  write SetSpeed <f64>: unbound (required)\n"));
    }

    #[test]
    fn tagged_json_export() {
        let json = serde_json::to_value(InterfaceDescription::Required(sample_required())).unwrap();
        assert_eq!(json["interface"], "required");
        assert_eq!(json["functions"][1]["requirement"], "required");
        assert_eq!(json["functions"][1]["kind"], "Write");
    }

    #[test]
    fn input_without_source() {
        let input = InputDescription {
            owner: "Logger".to_string(),
            name: "Samples".to_string(),
            source: None,
        };
        assert_eq!(input.to_string(), "input \"Logger.Samples\" <- (none)\n");
    }
}
