//! [`Mailbox`] – bounded FIFO of pending command invocations.
//!
//! Many producer threads may [`push`](Mailbox::push); exactly one consumer,
//! the component that owns the mailbox, calls [`drain`](Mailbox::drain) from
//! its run cycle.  The queue itself sits behind a short critical section;
//! command bodies always run *outside* it, so a body may push back into the
//! same mailbox without deadlocking.
//!
//! # Overflow
//!
//! A push on a full mailbox is rejected: the invocation is dropped, the drop
//! counter goes up by one, and the caller receives
//! [`ConduitError::MailboxFull`].  In-flight entries are never overwritten.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use conduit_middleware::mailbox::Mailbox;
//! use conduit_types::ExecutionResult;
//!
//! let mailbox = Mailbox::new("Control", 2);
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! for tag in ["A", "B", "C"] {
//!     let log = Arc::clone(&log);
//!     let _ = mailbox.push(tag, Box::new(move || {
//!         log.lock().unwrap().push(tag);
//!         ExecutionResult::Ok
//!     }));
//! }
//!
//! assert_eq!(mailbox.dropped(), 1);
//! assert_eq!(mailbox.drain().unwrap(), 2);
//! assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use conduit_types::{ConduitError, ExecutionResult};
use tracing::{debug, trace, warn};

/// A parked invocation: the command handle and its copied argument, captured
/// in one closure.
pub type Invocation = Box<dyn FnOnce() -> ExecutionResult + Send>;

struct Entry {
    command: String,
    invoke: Invocation,
}

/// Bounded multi-producer / single-consumer invocation queue.
pub struct Mailbox {
    name: String,
    capacity: usize,
    queue: Mutex<VecDeque<Entry>>,
    dropped: AtomicU64,
    /// Drops not yet returned by [`Mailbox::take_unreported_drops`].
    unreported: AtomicU64,
}

impl Mailbox {
    /// Create an empty mailbox holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
            unreported: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total number of rejected pushes since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of rejected pushes since the previous call, resetting the
    /// count.  Used by the owner to report overflow once per cycle.
    pub fn take_unreported_drops(&self) -> u64 {
        self.unreported.swap(0, Ordering::Relaxed)
    }

    /// Append `invoke` to the tail.
    ///
    /// # Errors
    ///
    /// [`ConduitError::MailboxFull`] when the mailbox already holds
    /// `capacity` entries; the invocation is dropped and counted.
    pub fn push(&self, command: &str, invoke: Invocation) -> Result<(), ConduitError> {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            drop(queue);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.unreported.fetch_add(1, Ordering::Relaxed);
            warn!(mailbox = %self.name, command, capacity = self.capacity, "mailbox full, invocation dropped");
            return Err(ConduitError::MailboxFull {
                mailbox: self.name.clone(),
                capacity: self.capacity,
            });
        }
        queue.push_back(Entry {
            command: command.to_string(),
            invoke,
        });
        trace!(mailbox = %self.name, command, depth = queue.len(), "invocation queued");
        Ok(())
    }

    /// Execute queued invocations from the head until the mailbox is empty.
    ///
    /// Must only be called by the owning component's thread.  Returns the
    /// number of invocations executed.
    ///
    /// # Errors
    ///
    /// [`ConduitError::MailboxCorrupted`] if the queue is ever found holding
    /// more than `capacity` entries.  Entries executed before the check
    /// failed are not rolled back.
    pub fn drain(&self) -> Result<usize, ConduitError> {
        let mut executed = 0;
        while let Some(entry) = self.pop()? {
            let result = (entry.invoke)();
            if !result.is_ok() {
                debug!(mailbox = %self.name, command = %entry.command, %result, "queued invocation did not complete");
            }
            executed += 1;
        }
        Ok(executed)
    }

    fn pop(&self) -> Result<Option<Entry>, ConduitError> {
        let mut queue = self.lock();
        if queue.len() > self.capacity {
            return Err(ConduitError::MailboxCorrupted {
                mailbox: self.name.clone(),
                len: queue.len(),
                capacity: self.capacity,
            });
        }
        Ok(queue.pop_front())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Invocation {
        let log = Arc::clone(log);
        Box::new(move || {
            log.lock().unwrap().push(value);
            ExecutionResult::Ok
        })
    }

    #[test]
    fn drain_preserves_push_order() {
        let mailbox = Mailbox::new("test", 16);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            mailbox.push("record", recorder(&log, i)).unwrap();
        }
        assert_eq!(mailbox.len(), 10);
        assert_eq!(mailbox.drain().unwrap(), 10);
        assert_eq!(*log.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn overflow_rejects_exactly_one_and_keeps_first_entries() {
        let mailbox = Mailbox::new("test", 4);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            mailbox.push("record", recorder(&log, i)).unwrap();
        }

        let err = mailbox.push("record", recorder(&log, 99)).unwrap_err();
        assert!(matches!(err, ConduitError::MailboxFull { capacity: 4, .. }));
        assert_eq!(mailbox.dropped(), 1);

        assert_eq!(mailbox.drain().unwrap(), 4);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn capacity_two_scenario() {
        let mailbox = Mailbox::new("test", 2);
        let log = Arc::new(Mutex::new(Vec::new()));
        assert!(mailbox.push("A", recorder(&log, 1)).is_ok());
        assert!(mailbox.push("B", recorder(&log, 2)).is_ok());
        assert!(mailbox.push("C", recorder(&log, 3)).is_err());
        assert_eq!(mailbox.drain().unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn slots_free_up_after_drain() {
        let mailbox = Mailbox::new("test", 1);
        let log = Arc::new(Mutex::new(Vec::new()));
        mailbox.push("a", recorder(&log, 1)).unwrap();
        assert!(mailbox.push("b", recorder(&log, 2)).is_err());
        mailbox.drain().unwrap();
        assert!(mailbox.push("c", recorder(&log, 3)).is_ok());
        assert_eq!(mailbox.dropped(), 1);
    }

    #[test]
    fn unreported_drops_reset_after_take() {
        let mailbox = Mailbox::new("test", 1);
        let log = Arc::new(Mutex::new(Vec::new()));
        mailbox.push("a", recorder(&log, 1)).unwrap();
        let _ = mailbox.push("b", recorder(&log, 2));
        let _ = mailbox.push("c", recorder(&log, 3));
        assert_eq!(mailbox.take_unreported_drops(), 2);
        assert_eq!(mailbox.take_unreported_drops(), 0);
        assert_eq!(mailbox.dropped(), 2);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mailbox = Mailbox::new("test", 0);
        assert_eq!(mailbox.capacity(), 1);
    }

    #[test]
    fn body_may_push_into_its_own_mailbox() {
        let mailbox = Arc::new(Mailbox::new("test", 4));
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_box = Arc::clone(&mailbox);
        let inner_log = Arc::clone(&log);
        mailbox
            .push(
                "outer",
                Box::new(move || {
                    let _ = inner_box.push("inner", recorder(&inner_log, 2));
                    inner_log.lock().unwrap().push(1);
                    ExecutionResult::Ok
                }),
            )
            .unwrap();
        assert_eq!(mailbox.drain().unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn concurrent_producers_never_exceed_capacity() {
        let mailbox = Arc::new(Mailbox::new("test", 32));
        let log = Arc::new(Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mailbox = Arc::clone(&mailbox);
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..20 {
                        let _ = mailbox.push("record", recorder(&log, t * 100 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(mailbox.len(), 32);
        assert_eq!(mailbox.dropped(), 80 - 32);
        assert_eq!(mailbox.drain().unwrap(), 32);

        // Per-producer submission order survives the interleaving.
        let log = log.lock().unwrap();
        for t in 0..4 {
            let mine: Vec<_> = log.iter().filter(|v| **v / 100 == t).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
