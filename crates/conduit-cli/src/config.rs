//! CLI configuration – reads/writes `~/.conduit/config.toml`.
//!
//! ```toml
//! [manager]
//! mailbox_capacity = 16
//! kill_timeout_ms = 2000
//!
//! [demo]
//! period_ms = 100
//! run_secs = 5
//! target_speed = 2.5
//! ```
//!
//! `CONDUIT_CONFIG` points at a different file.  The `[manager]` table is a
//! [`ManagerConfig`] and takes its `CONDUIT_*` environment overrides on load.

use std::fs;
use std::path::{Path, PathBuf};

use conduit_runtime::ManagerConfig;
use serde::{Deserialize, Serialize};

/// Settings of the demo system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Cycle period of both demo components.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// How long the demo runs before it kills itself; `0` runs until Ctrl-C.
    #[serde(default = "default_run_secs")]
    pub run_secs: u64,

    /// Speed the controller ramps the motor up to.
    #[serde(default = "default_target_speed")]
    pub target_speed: f64,
}

fn default_period_ms() -> u64 {
    100
}
fn default_run_secs() -> u64 {
    5
}
fn default_target_speed() -> f64 {
    2.5
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            run_secs: default_run_secs(),
            target_speed: default_target_speed(),
        }
    }
}

/// Persisted CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manager: ManagerConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

/// `CONDUIT_CONFIG` if set, else `~/.conduit/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CONDUIT_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".conduit").join("config.toml")
}

/// Load the config from [`config_path`].  Returns `None` if the file does
/// not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {e}", path.display()))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {e}"))?;
    cfg.manager.apply_env_overrides();
    Ok(Some(cfg))
}

pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save `cfg` to `path`, owner-only on Unix.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {e}"))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {e}"))?;
        }
    }
    let raw = toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {e}"))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {e}", path.display()))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {e}", path.display()))?;
    Ok(())
}
