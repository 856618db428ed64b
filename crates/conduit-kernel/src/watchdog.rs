//! [`Watchdog`] – component heartbeat monitor.
//!
//! Every active component calls [`Watchdog::heartbeat`] at the end of each
//! run cycle.  The watchdog tracks the timestamp of each heartbeat and
//! considers a component *frozen* when its deadline has been exceeded.
//!
//! Deadlines derive from the component's period: `period × timeout_factor`,
//! never shorter than `min_timeout`.  Continuous components get
//! `min_timeout`.
//!
//! The watchdog is shared between the manager and every component thread,
//! so all methods take `&self`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Health state reported for a single component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentHealth {
    /// The component has sent a heartbeat within its deadline.
    Healthy,
    /// The component has not sent a heartbeat within its deadline.
    TimedOut,
}

pub const DEFAULT_TIMEOUT_FACTOR: u32 = 5;
pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_millis(500);

// ────────────────────────────────────────────────────────────────────────────
// Internal entry
// ────────────────────────────────────────────────────────────────────────────

struct ComponentEntry {
    last_heartbeat: Instant,
    timeout: Duration,
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks heartbeats from running components and detects frozen ones.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use conduit_kernel::watchdog::{ComponentHealth, Watchdog};
///
/// let wd = Watchdog::new();
/// wd.register("Robot", Duration::from_secs(1));
/// wd.heartbeat("Robot");
///
/// assert_eq!(wd.health("Robot"), ComponentHealth::Healthy);
/// assert_eq!(wd.timeout_for(Some(Duration::from_millis(200))), Duration::from_secs(1));
/// ```
pub struct Watchdog {
    timeout_factor: u32,
    min_timeout: Duration,
    components: Mutex<HashMap<String, ComponentEntry>>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::with_policy(DEFAULT_TIMEOUT_FACTOR, DEFAULT_MIN_TIMEOUT)
    }
}

impl Watchdog {
    /// Create an empty watchdog with the default deadline policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty watchdog whose deadlines are `period × timeout_factor`,
    /// floored at `min_timeout`.
    pub fn with_policy(timeout_factor: u32, min_timeout: Duration) -> Self {
        Self {
            timeout_factor: timeout_factor.max(1),
            min_timeout,
            components: Mutex::new(HashMap::new()),
        }
    }

    /// Deadline for a component running every `period` (`None` for
    /// continuous components).
    pub fn timeout_for(&self, period: Option<Duration>) -> Duration {
        period
            .map(|p| p.saturating_mul(self.timeout_factor))
            .unwrap_or_default()
            .max(self.min_timeout)
    }

    /// Register `component` with a maximum heartbeat `timeout`.
    ///
    /// The component's last-heartbeat timestamp is initialised to now, so it
    /// starts in a [`ComponentHealth::Healthy`] state.
    ///
    /// Re-registering an existing component resets its deadline.
    pub fn register(&self, component: &str, timeout: Duration) {
        self.lock().insert(
            component.to_string(),
            ComponentEntry {
                last_heartbeat: Instant::now(),
                timeout,
            },
        );
    }

    /// Stop tracking `component` (stopped or terminated components do not
    /// heartbeat).
    pub fn unregister(&self, component: &str) {
        self.lock().remove(component);
    }

    /// Record a heartbeat for `component`, resetting its deadline.
    ///
    /// No-ops for components that have not been registered.
    pub fn heartbeat(&self, component: &str) {
        if let Some(entry) = self.lock().get_mut(component) {
            entry.last_heartbeat = Instant::now();
        }
    }

    /// Return the [`ComponentHealth`] of `component`.
    ///
    /// Returns [`ComponentHealth::TimedOut`] for unknown components.
    pub fn health(&self, component: &str) -> ComponentHealth {
        match self.lock().get(component) {
            Some(entry) if entry.last_heartbeat.elapsed() <= entry.timeout => {
                ComponentHealth::Healthy
            }
            _ => ComponentHealth::TimedOut,
        }
    }

    /// Names of all components whose heartbeat deadline has been exceeded,
    /// sorted.
    pub fn check_all(&self) -> Vec<String> {
        let mut frozen: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.last_heartbeat.elapsed() > entry.timeout)
            .map(|(name, _)| name.clone())
            .collect();
        frozen.sort();
        frozen
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ComponentEntry>> {
        self.components.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fresh_component_is_healthy() {
        let wd = Watchdog::new();
        wd.register("Robot", Duration::from_secs(5));
        assert_eq!(wd.health("Robot"), ComponentHealth::Healthy);
    }

    #[test]
    fn heartbeat_resets_deadline() {
        let wd = Watchdog::new();
        wd.register("Controller", Duration::from_millis(40));
        thread::sleep(Duration::from_millis(25));
        wd.heartbeat("Controller");
        thread::sleep(Duration::from_millis(25));
        assert_eq!(wd.health("Controller"), ComponentHealth::Healthy);
    }

    #[test]
    fn component_times_out_when_silent() {
        let wd = Watchdog::new();
        wd.register("Logger", Duration::from_millis(20));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(wd.health("Logger"), ComponentHealth::TimedOut);
    }

    #[test]
    fn check_all_returns_frozen_components_sorted() {
        let wd = Watchdog::new();
        wd.register("b_fast", Duration::from_millis(20));
        wd.register("a_fast", Duration::from_millis(20));
        wd.register("slow", Duration::from_secs(60));

        thread::sleep(Duration::from_millis(30));

        assert_eq!(wd.check_all(), vec!["a_fast", "b_fast"]);
    }

    #[test]
    fn unregistered_component_is_not_reported() {
        let wd = Watchdog::new();
        wd.register("Robot", Duration::from_millis(10));
        wd.unregister("Robot");
        thread::sleep(Duration::from_millis(20));
        assert!(wd.check_all().is_empty());
        assert_eq!(wd.health("Robot"), ComponentHealth::TimedOut);
    }

    #[test]
    fn heartbeat_on_unknown_component_is_noop() {
        let wd = Watchdog::new();
        wd.heartbeat("ghost");
        assert!(wd.check_all().is_empty());
    }

    #[test]
    fn deadline_policy() {
        let wd = Watchdog::with_policy(4, Duration::from_millis(100));
        assert_eq!(
            wd.timeout_for(Some(Duration::from_millis(50))),
            Duration::from_millis(200)
        );
        assert_eq!(
            wd.timeout_for(Some(Duration::from_millis(10))),
            Duration::from_millis(100)
        );
        assert_eq!(wd.timeout_for(None), Duration::from_millis(100));
    }
}
