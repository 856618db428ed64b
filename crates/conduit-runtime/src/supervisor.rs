//! Async health supervision for a running [`ComponentManager`].
//!
//! Component threads are plain OS threads; the supervisor is the only part
//! of the system that runs on Tokio.  It polls the watchdog on a fixed
//! interval until every managed component has terminated.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use conduit_types::ComponentState;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::manager::ComponentManager;

/// Poll [`ComponentManager::check_health`] every `period` until all
/// components are terminated.  Returns every component that missed its
/// heartbeat at least once, sorted.
pub async fn supervise(manager: Arc<ComponentManager>, period: Duration) -> Vec<String> {
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut missed = BTreeSet::new();

    loop {
        ticker.tick().await;
        for name in manager.check_health() {
            if missed.insert(name.clone()) {
                debug!(component = %name, "first missed heartbeat recorded");
            }
        }
        if all_terminated(&manager) {
            break;
        }
    }

    info!(missed = missed.len(), "supervisor finished");
    missed.into_iter().collect()
}

fn all_terminated(manager: &ComponentManager) -> bool {
    manager
        .names_of_components()
        .iter()
        .filter_map(|name| manager.component(name))
        .all(|c| c.state() == ComponentState::Terminated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_kernel::{Component, ComponentKind};

    #[tokio::test]
    async fn returns_once_everything_terminated() {
        let manager = Arc::new(ComponentManager::default());
        manager
            .add_component(Component::new("Robot", ComponentKind::Passive))
            .unwrap();
        manager.create_all().unwrap();
        manager.start_all().unwrap();
        manager.kill_all().unwrap();

        let missed = supervise(Arc::clone(&manager), Duration::from_millis(5)).await;
        assert!(missed.is_empty());
    }

    #[tokio::test]
    async fn collects_missed_heartbeats() {
        let manager = Arc::new(ComponentManager::default());
        manager
            .add_component(Component::new("Robot", ComponentKind::Passive))
            .unwrap();
        manager.create_all().unwrap();
        manager.start_all().unwrap();
        manager.watchdog().register("Ghost", Duration::from_millis(1));

        let task = tokio::spawn(supervise(Arc::clone(&manager), Duration::from_millis(5)));
        tokio::time::sleep(Duration::from_millis(40)).await;
        manager.kill_all().unwrap();

        let missed = task.await.unwrap();
        assert_eq!(missed, vec!["Ghost"]);
    }
}
