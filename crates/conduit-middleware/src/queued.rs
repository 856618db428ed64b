//! Queued decorators.
//!
//! [`QueuedVoid`] and [`QueuedWrite`] wrap a real command and a [`Mailbox`].
//! Executing the decorator does not run the body: it parks an invocation
//! (with a *copy* of the argument, since the caller's borrow ends when
//! `execute` returns) and the mailbox owner runs it later on its own thread.
//!
//! Each parked invocation owns a shared handle to the real command, so
//! disconnecting an interface while entries are still queued is safe: the
//! entries simply run against the command they were queued for.
//!
//! Only Void and Write are ever queued.  Read-style commands hand data back
//! to the caller and therefore always execute directly.

use std::sync::Arc;

use conduit_types::ExecutionResult;

use crate::command::{Command, CommandBase, VoidCommand, WriteCommand};
use crate::mailbox::Mailbox;

/// Void command that defers its body to a mailbox.
pub struct QueuedVoid {
    base: CommandBase,
    actual: Arc<dyn VoidCommand>,
    mailbox: Arc<Mailbox>,
}

impl QueuedVoid {
    pub fn new(actual: Arc<dyn VoidCommand>, mailbox: Arc<Mailbox>) -> Self {
        Self {
            base: CommandBase::new(actual.name()),
            actual,
            mailbox,
        }
    }

    /// The command that runs when the invocation is drained.
    pub fn actual(&self) -> &Arc<dyn VoidCommand> {
        &self.actual
    }
}

impl Command for QueuedVoid {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl VoidCommand for QueuedVoid {
    fn execute(&self) -> ExecutionResult {
        if !self.is_enabled() || !self.actual.is_enabled() {
            return ExecutionResult::Disabled;
        }
        let actual = Arc::clone(&self.actual);
        match self.mailbox.push(self.name(), Box::new(move || actual.execute())) {
            Ok(()) => ExecutionResult::Ok,
            Err(_) => ExecutionResult::MailboxFull,
        }
    }
}

/// Write command that copies its argument into a mailbox.
pub struct QueuedWrite<T> {
    base: CommandBase,
    actual: Arc<dyn WriteCommand<T>>,
    mailbox: Arc<Mailbox>,
}

impl<T> QueuedWrite<T> {
    pub fn new(actual: Arc<dyn WriteCommand<T>>, mailbox: Arc<Mailbox>) -> Self {
        Self {
            base: CommandBase::new(actual.name()),
            actual,
            mailbox,
        }
    }

    pub fn actual(&self) -> &Arc<dyn WriteCommand<T>> {
        &self.actual
    }
}

impl<T> Command for QueuedWrite<T> {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl<T> WriteCommand<T> for QueuedWrite<T>
where
    T: Clone + Send + 'static,
{
    fn execute(&self, arg: &T) -> ExecutionResult {
        if !self.is_enabled() || !self.actual.is_enabled() {
            return ExecutionResult::Disabled;
        }
        let actual = Arc::clone(&self.actual);
        let copy = arg.clone();
        match self
            .mailbox
            .push(self.name(), Box::new(move || actual.execute(&copy)))
        {
            Ok(()) => ExecutionResult::Ok,
            Err(_) => ExecutionResult::MailboxFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{VoidFn, WriteFn};
    use std::sync::Mutex;

    #[test]
    fn queued_write_defers_until_drain() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let actual: Arc<dyn WriteCommand<f64>> =
            Arc::new(WriteFn::new("SetSpeed", move |v: &f64| sink.lock().unwrap().push(*v)));
        let mailbox = Arc::new(Mailbox::new("Control", 16));
        let queued = QueuedWrite::new(actual, Arc::clone(&mailbox));

        assert_eq!(queued.name(), "SetSpeed");
        assert_eq!(queued.execute(&5.0), ExecutionResult::Ok);
        assert!(recorded.lock().unwrap().is_empty());

        assert_eq!(mailbox.drain().unwrap(), 1);
        assert_eq!(*recorded.lock().unwrap(), vec![5.0]);
    }

    #[test]
    fn queued_write_copies_argument() {
        let recorded = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&recorded);
        let actual: Arc<dyn WriteCommand<String>> = Arc::new(WriteFn::new(
            "SetLabel",
            move |v: &String| *sink.lock().unwrap() = v.clone(),
        ));
        let mailbox = Arc::new(Mailbox::new("Control", 16));
        let queued = QueuedWrite::new(actual, Arc::clone(&mailbox));

        {
            let temporary = String::from("first");
            queued.execute(&temporary);
        }
        mailbox.drain().unwrap();
        assert_eq!(*recorded.lock().unwrap(), "first");
    }

    #[test]
    fn full_mailbox_reports_mailbox_full() {
        let actual: Arc<dyn VoidCommand> = Arc::new(VoidFn::new("Ping", || {}));
        let mailbox = Arc::new(Mailbox::new("Control", 1));
        let queued = QueuedVoid::new(actual, Arc::clone(&mailbox));

        assert_eq!(queued.execute(), ExecutionResult::Ok);
        assert_eq!(queued.execute(), ExecutionResult::MailboxFull);
        assert_eq!(mailbox.dropped(), 1);
    }

    #[test]
    fn disabled_decorator_does_not_enqueue() {
        let actual: Arc<dyn VoidCommand> = Arc::new(VoidFn::new("Ping", || {}));
        let mailbox = Arc::new(Mailbox::new("Control", 4));
        let queued = QueuedVoid::new(actual, Arc::clone(&mailbox));

        queued.disable();
        assert_eq!(queued.execute(), ExecutionResult::Disabled);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn disabled_actual_command_is_rejected_at_call_site() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        let concrete = Arc::new(WriteFn::new("SetSpeed", move |v: &f64| sink.lock().unwrap().push(*v)));
        let actual: Arc<dyn WriteCommand<f64>> = concrete.clone();
        let mailbox = Arc::new(Mailbox::new("Control", 4));
        let queued = QueuedWrite::new(actual, Arc::clone(&mailbox));

        concrete.disable();
        assert_eq!(queued.execute(&5.0), ExecutionResult::Disabled);
        assert!(mailbox.is_empty());

        concrete.enable();
        assert_eq!(queued.execute(&5.0), ExecutionResult::Ok);
        assert_eq!(mailbox.drain().unwrap(), 1);
        assert_eq!(*recorded.lock().unwrap(), vec![5.0]);
    }
}
