//! `conduit-interface` – provided and required interfaces and the binding
//! protocol that connects them.
//!
//! A component *provides* commands and events through a
//! [`ProvidedInterface`] and *requires* them through a [`RequiredInterface`].
//! [`RequiredInterface::connect`] resolves every declared function slot by
//! name, wrapping Void/Write commands in a per-connection mailbox when the
//! provider queues commands, and attaches event handlers in the opposite
//! direction.
//!
//! # End-to-end example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use conduit_interface::{ProvidedInterface, RequiredInterface};
//! use conduit_types::{ExecutionResult, QueuingPolicy, Requirement};
//!
//! let control = Arc::new(ProvidedInterface::new(
//!     "Robot", "Control", QueuingPolicy::CommandsQueued, 16,
//! ));
//! let speed = Arc::new(Mutex::new(None));
//! let state = Arc::clone(&speed);
//! control
//!     .add_command_write("SetSpeed", move |v: &f64| *state.lock().unwrap() = Some(*v))
//!     .unwrap();
//!
//! let motor = RequiredInterface::new("Controller", "Motor", None);
//! let set_speed = motor
//!     .add_function_write::<f64>("SetSpeed", Requirement::Required)
//!     .unwrap();
//!
//! motor.connect(&control).unwrap();
//! assert_eq!(set_speed.execute(&5.0), ExecutionResult::Ok);
//!
//! // Runs on the provider's cycle.
//! control.process_mailboxes().unwrap();
//! assert_eq!(*speed.lock().unwrap(), Some(5.0));
//! ```

pub mod description;
pub mod event;
pub mod function;
pub mod port;
pub mod provided;
pub mod required;

pub use description::{
    CommandDescription, EventDescription, EventHandlerDescription, FunctionDescription,
    InputDescription, InterfaceDescription, OutputDescription, ProvidedDescription,
    RequiredDescription,
};
pub use event::{EventVoid, EventWrite};
pub use function::{FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionWrite};
pub use port::{InputInterface, OutputInterface, ProvidedOrOutput, RequiredOrInput};
pub use provided::ProvidedInterface;
pub use required::RequiredInterface;
