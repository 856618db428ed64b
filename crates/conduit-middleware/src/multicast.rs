//! Multicast commands – one invocation, many targets.
//!
//! A provided interface raises each of its events through a multicast
//! command; every connected required interface that registered a handler for
//! that event becomes a member.  Members are invoked in the order they were
//! added.  All members always run; the aggregate result is
//! [`ExecutionResult::Ok`] only when every member returned `Ok`, otherwise
//! it is the first non-`Ok` result seen.
//!
//! The member list is snapshotted before execution, so handlers may be added
//! or removed concurrently with a raise without blocking it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use conduit_types::ExecutionResult;

use crate::command::{Command, CommandBase, VoidCommand, WriteCommand};

/// Handle returned by `add`, used to remove the member again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(u64);

struct Members<C: ?Sized> {
    next_id: AtomicU64,
    list: RwLock<Vec<(MemberId, Arc<C>)>>,
}

impl<C: ?Sized> Members<C> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            list: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, command: Arc<C>) -> MemberId {
        let id = MemberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.list
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, command));
        id
    }

    fn remove(&self, id: MemberId) -> bool {
        let mut list = self.list.write().unwrap_or_else(PoisonError::into_inner);
        let before = list.len();
        list.retain(|(member, _)| *member != id);
        list.len() != before
    }

    fn len(&self) -> usize {
        self.list.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn snapshot(&self) -> Vec<Arc<C>> {
        self.list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, command)| Arc::clone(command))
            .collect()
    }
}

/// Fold member results: `Ok` iff all are `Ok`, else the first failure.
fn aggregate(results: impl IntoIterator<Item = ExecutionResult>) -> ExecutionResult {
    let mut first_failure = None;
    for result in results {
        if !result.is_ok() && first_failure.is_none() {
            first_failure = Some(result);
        }
    }
    first_failure.unwrap_or(ExecutionResult::Ok)
}

/// Zero-argument multicast.
pub struct MulticastVoid {
    base: CommandBase,
    members: Members<dyn VoidCommand>,
}

impl MulticastVoid {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: CommandBase::new(name),
            members: Members::new(),
        }
    }

    pub fn add(&self, command: Arc<dyn VoidCommand>) -> MemberId {
        self.members.add(command)
    }

    /// Returns `false` when `id` was not a member.
    pub fn remove(&self, id: MemberId) -> bool {
        self.members.remove(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Command for MulticastVoid {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl VoidCommand for MulticastVoid {
    fn execute(&self) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        let members = self.members.snapshot();
        aggregate(members.iter().map(|m| m.execute()))
    }
}

/// One-argument multicast.
pub struct MulticastWrite<T> {
    base: CommandBase,
    members: Members<dyn WriteCommand<T>>,
}

impl<T> MulticastWrite<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: CommandBase::new(name),
            members: Members::new(),
        }
    }

    pub fn add(&self, command: Arc<dyn WriteCommand<T>>) -> MemberId {
        self.members.add(command)
    }

    pub fn remove(&self, id: MemberId) -> bool {
        self.members.remove(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Command for MulticastWrite<T> {
    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl<T> WriteCommand<T> for MulticastWrite<T> {
    fn execute(&self, arg: &T) -> ExecutionResult {
        if !self.is_enabled() {
            return ExecutionResult::Disabled;
        }
        let members = self.members.snapshot();
        aggregate(members.iter().map(|m| m.execute(arg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{VoidFn, WriteFn};
    use std::sync::Mutex;

    fn counting(name: &str, hits: &Arc<Mutex<Vec<String>>>) -> Arc<dyn VoidCommand> {
        let hits = Arc::clone(hits);
        let tag = name.to_string();
        Arc::new(VoidFn::new(name, move || hits.lock().unwrap().push(tag.clone())))
    }

    #[test]
    fn all_members_run_in_order() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let multicast = MulticastVoid::new("Tick");
        multicast.add(counting("a", &hits));
        multicast.add(counting("b", &hits));
        multicast.add(counting("c", &hits));

        assert_eq!(multicast.execute(), ExecutionResult::Ok);
        assert_eq!(*hits.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn failure_is_reported_but_everyone_runs() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let multicast = MulticastVoid::new("Tick");
        multicast.add(counting("a", &hits));
        let disabled = counting("b", &hits);
        disabled.disable();
        multicast.add(disabled);
        multicast.add(counting("c", &hits));

        assert_eq!(multicast.execute(), ExecutionResult::Disabled);
        assert_eq!(*hits.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn first_failure_wins() {
        assert_eq!(
            aggregate([
                ExecutionResult::Ok,
                ExecutionResult::MailboxFull,
                ExecutionResult::Disabled,
            ]),
            ExecutionResult::MailboxFull
        );
        assert_eq!(aggregate([]), ExecutionResult::Ok);
    }

    #[test]
    fn empty_multicast_is_ok() {
        let multicast = MulticastWrite::<u32>::new("Changed");
        assert!(multicast.is_empty());
        assert_eq!(multicast.execute(&1), ExecutionResult::Ok);
    }

    #[test]
    fn write_members_receive_same_argument() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let multicast = MulticastWrite::<i32>::new("Changed");
        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            multicast.add(Arc::new(WriteFn::new("h", move |v: &i32| {
                seen.lock().unwrap().push(*v)
            })));
        }
        assert_eq!(multicast.execute(&7), ExecutionResult::Ok);
        assert_eq!(*seen.lock().unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn removed_member_no_longer_runs() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let multicast = MulticastVoid::new("Tick");
        let a = multicast.add(counting("a", &hits));
        multicast.add(counting("b", &hits));

        assert!(multicast.remove(a));
        assert!(!multicast.remove(a));
        assert_eq!(multicast.len(), 1);

        multicast.execute();
        assert_eq!(*hits.lock().unwrap(), vec!["b"]);
    }
}
