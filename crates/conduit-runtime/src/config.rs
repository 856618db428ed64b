//! [`ManagerConfig`] – tunables of a [`ComponentManager`](crate::ComponentManager).
//!
//! Parsed from TOML; every field has a default, so an empty document is a
//! valid configuration.  The binary embeds it as the `[manager]` table of its
//! own config file.
//!
//! ```toml
//! mailbox_capacity = 16
//! watchdog_timeout_factor = 5
//! watchdog_min_timeout_ms = 500
//! kill_timeout_ms = 2000
//! bus_capacity = 256
//! ```
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |---|---|
//! | `CONDUIT_MAILBOX_CAPACITY` | `mailbox_capacity` |
//! | `CONDUIT_WATCHDOG_TIMEOUT_FACTOR` | `watchdog_timeout_factor` |
//! | `CONDUIT_WATCHDOG_MIN_TIMEOUT_MS` | `watchdog_min_timeout_ms` |
//! | `CONDUIT_KILL_TIMEOUT_MS` | `kill_timeout_ms` |
//! | `CONDUIT_BUS_CAPACITY` | `bus_capacity` |
//!
//! Values that do not parse are ignored.

use std::str::FromStr;
use std::time::Duration;

use conduit_types::{ConduitError, DEFAULT_MAILBOX_CAPACITY};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Mailbox capacity of components built with
    /// [`ComponentManager::new_component`](crate::ComponentManager::new_component).
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Heartbeat deadline = period × factor.
    #[serde(default = "default_watchdog_timeout_factor")]
    pub watchdog_timeout_factor: u32,

    /// Floor for heartbeat deadlines, and the deadline of continuous
    /// components.
    #[serde(default = "default_watchdog_min_timeout_ms")]
    pub watchdog_min_timeout_ms: u64,

    /// How long `kill_all` waits for each component to terminate.
    #[serde(default = "default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,

    /// Events buffered per lifecycle bus channel.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_mailbox_capacity() -> usize {
    DEFAULT_MAILBOX_CAPACITY
}
fn default_watchdog_timeout_factor() -> u32 {
    5
}
fn default_watchdog_min_timeout_ms() -> u64 {
    500
}
fn default_kill_timeout_ms() -> u64 {
    2000
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            watchdog_timeout_factor: default_watchdog_timeout_factor(),
            watchdog_min_timeout_ms: default_watchdog_min_timeout_ms(),
            kill_timeout_ms: default_kill_timeout_ms(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl ManagerConfig {
    pub fn watchdog_min_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_min_timeout_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConduitError> {
        toml::from_str(raw).map_err(|e| ConduitError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply `CONDUIT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        override_from_env("CONDUIT_MAILBOX_CAPACITY", &mut self.mailbox_capacity);
        override_from_env(
            "CONDUIT_WATCHDOG_TIMEOUT_FACTOR",
            &mut self.watchdog_timeout_factor,
        );
        override_from_env(
            "CONDUIT_WATCHDOG_MIN_TIMEOUT_MS",
            &mut self.watchdog_min_timeout_ms,
        );
        override_from_env("CONDUIT_KILL_TIMEOUT_MS", &mut self.kill_timeout_ms);
        override_from_env("CONDUIT_BUS_CAPACITY", &mut self.bus_capacity);
    }
}

fn override_from_env<T: FromStr>(var: &str, field: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *field = value,
        Err(_) => warn!(variable = var, value = %raw, "ignoring unparsable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = ManagerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.mailbox_capacity, 16);
        assert_eq!(config.kill_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = ManagerConfig::from_toml_str("mailbox_capacity = 4\n").unwrap();
        assert_eq!(config.mailbox_capacity, 4);
        assert_eq!(config.watchdog_timeout_factor, 5);
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = ManagerConfig::from_toml_str("mailbox_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
    }

    #[test]
    fn env_override_applies_and_invalid_is_ignored() {
        // SAFETY: these variables are only touched by this test.
        unsafe {
            std::env::set_var("CONDUIT_KILL_TIMEOUT_MS", "750");
            std::env::set_var("CONDUIT_BUS_CAPACITY", "lots");
        }
        let mut config = ManagerConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.kill_timeout_ms, 750);
        assert_eq!(config.bus_capacity, 256);
        unsafe {
            std::env::remove_var("CONDUIT_KILL_TIMEOUT_MS");
            std::env::remove_var("CONDUIT_BUS_CAPACITY");
        }
    }
}
