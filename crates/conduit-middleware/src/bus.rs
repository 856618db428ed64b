//! Lifecycle event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message without any single subscriber blocking the others.  Sending
//! is synchronous, so component threads publish without needing a Tokio
//! runtime; only subscribers that want to `.await` need one.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`LifecycleTopic::StateChanges`] | Constructed → Created → Running → … transitions |
//! | [`LifecycleTopic::Alerts`] | Mailbox overflow, cycle faults, missed heartbeats |
//!
//! Every event is also delivered on the global channel returned by
//! [`LifecycleBus::subscribe`].

use conduit_types::{LifecycleEvent, LifecyclePayload};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the lifecycle bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleTopic {
    StateChanges,
    Alerts,
}

impl LifecycleTopic {
    /// The lane a payload is routed to.
    pub fn of(payload: &LifecyclePayload) -> Self {
        match payload {
            LifecyclePayload::StateChanged { .. } => LifecycleTopic::StateChanges,
            LifecyclePayload::MailboxOverflow { .. }
            | LifecyclePayload::CycleFault { .. }
            | LifecyclePayload::HeartbeatMissed => LifecycleTopic::Alerts,
        }
    }
}

/// Shared lifecycle bus. Clones share the same channels.
#[derive(Clone, Debug)]
pub struct LifecycleBus {
    all: broadcast::Sender<LifecycleEvent>,
    state_changes: broadcast::Sender<LifecycleEvent>,
    alerts: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleBus {
    /// Create a bus whose channels each buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (all, _) = broadcast::channel(capacity);
        let (state_changes, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self {
            all,
            state_changes,
            alerts,
        }
    }

    /// Publish `event` on its topic lane and on the global channel.
    ///
    /// Returns the number of receivers that were handed the event.  Zero
    /// subscribers is a normal condition for a component system that nobody
    /// is watching, so it is not an error.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        let topic = LifecycleTopic::of(&event.payload);
        let on_topic = self.topic_sender(topic).send(event.clone()).unwrap_or(0);
        let on_all = self.all.send(event).unwrap_or(0);
        if on_topic + on_all == 0 {
            trace!(?topic, "lifecycle event published with no subscribers");
        }
        on_topic + on_all
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> LifecycleReceiver {
        LifecycleReceiver {
            topic: None,
            receiver: self.all.subscribe(),
        }
    }

    /// Subscribe to one lane.
    pub fn subscribe_to(&self, topic: LifecycleTopic) -> LifecycleReceiver {
        LifecycleReceiver {
            topic: Some(topic),
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: LifecycleTopic) -> &broadcast::Sender<LifecycleEvent> {
        match topic {
            LifecycleTopic::StateChanges => &self.state_changes,
            LifecycleTopic::Alerts => &self.alerts,
        }
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiver half obtained from [`LifecycleBus::subscribe`] or
/// [`LifecycleBus::subscribe_to`].
pub struct LifecycleReceiver {
    topic: Option<LifecycleTopic>,
    receiver: broadcast::Receiver<LifecycleEvent>,
}

impl LifecycleReceiver {
    /// Wait for the next event.  Lagging is logged and skipped; `None` means
    /// the bus has shut down.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "lifecycle receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for synchronous callers.  Returns `None` when no
    /// event is waiting.
    pub fn try_recv(&mut self) -> Option<LifecycleEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "lifecycle receiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// The lane this receiver is bound to, `None` for the global channel.
    pub fn topic(&self) -> Option<LifecycleTopic> {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_types::ComponentState;

    fn state_event(component: &str) -> LifecycleEvent {
        LifecycleEvent::new(
            component,
            LifecyclePayload::StateChanged {
                from: ComponentState::Created,
                to: ComponentState::Running,
            },
        )
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = LifecycleBus::default();
        assert_eq!(bus.publish(state_event("Robot1")), 0);
    }

    #[tokio::test]
    async fn global_subscriber_sees_every_topic() {
        let bus = LifecycleBus::default();
        let mut rx = bus.subscribe();

        bus.publish(state_event("Robot1"));
        bus.publish(LifecycleEvent::new("Robot1", LifecyclePayload::HeartbeatMissed));

        let first = rx.recv().await.expect("state event");
        let second = rx.recv().await.expect("alert event");
        assert!(matches!(first.payload, LifecyclePayload::StateChanged { .. }));
        assert_eq!(second.payload, LifecyclePayload::HeartbeatMissed);
    }

    #[tokio::test]
    async fn topic_subscriber_only_sees_its_lane() {
        let bus = LifecycleBus::default();
        let mut alerts = bus.subscribe_to(LifecycleTopic::Alerts);
        assert_eq!(alerts.topic(), Some(LifecycleTopic::Alerts));

        bus.publish(state_event("Robot1"));
        let fault = LifecycleEvent::new(
            "Robot1",
            LifecyclePayload::CycleFault {
                message: "boom".to_string(),
            },
        );
        bus.publish(fault.clone());

        let received = alerts.recv().await.expect("alert");
        assert_eq!(received.id, fault.id);
        assert!(alerts.try_recv().is_none());
    }

    #[test]
    fn try_recv_is_non_blocking() {
        let bus = LifecycleBus::default();
        let mut rx = bus.subscribe_to(LifecycleTopic::StateChanges);
        assert!(rx.try_recv().is_none());

        let event = state_event("Robot2");
        assert_eq!(bus.publish(event.clone()), 1);
        assert_eq!(rx.try_recv().map(|e| e.id), Some(event.id));
    }

    #[test]
    fn slow_receiver_skips_lagged_events() {
        let bus = LifecycleBus::new(4);
        let mut rx = bus.subscribe();
        for _ in 0..10 {
            bus.publish(state_event("flood"));
        }
        let mut received = 0;
        while rx.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
    }
}
