//! TOML-based configuration for the daemon.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Linux:    `$XDG_CONFIG_HOME/brld/config.toml` (or `~/.config/brld/config.toml`)
//! - macOS:    `~/Library/Application Support/brld/config.toml`
//! - Windows:  `%APPDATA%\brld\config.toml`
//!
//! A missing file is not an error: every field has a default, so the daemon
//! runs out of the box with driver autodetection on the USB bus and the
//! first serial port.
//!
//! ```toml
//! [daemon]
//! log_level = "info"
//! poll_interval_ms = 40
//!
//! [braille]
//! drivers = ["auto"]
//! devices = ["usb:", "serial:/dev/ttyS0"]
//! retry_interval_ms = 5000
//! legacy_firmware = false
//! firmness = 2
//!
//! [speech]
//! drivers = ["auto"]
//! retry_interval_ms = 5000
//!
//! [screen]
//! drivers = ["auto"]
//! retry_interval_ms = 5000
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent, and whole sections default through `Default`,
//! so partial files only need to name what they change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use brl_core::{Firmness, TransportOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub braille: BrailleConfig,
    #[serde(default)]
    pub speech: DriverConfig,
    #[serde(default)]
    pub screen: DriverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How often the control loop polls the braille display.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Braille driver selection and display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrailleConfig {
    /// Driver codes to try, or `["auto"]`.
    #[serde(default = "default_drivers")]
    pub drivers: Vec<String>,
    /// Device identifiers (`serial:/dev/ttyS0`, `usb:`, `usb:<serial>`), tried in order.
    #[serde(default = "default_braille_devices")]
    pub devices: Vec<String>,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Serial ABT3 units with the one-byte key protocol.
    #[serde(default)]
    pub legacy_firmware: bool,
    /// Dot firmness, 0 (minimum) to 4 (maximum).
    #[serde(default = "default_firmness")]
    pub firmness: u8,
}

/// Driver selection for the speech and screen classes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    #[serde(default = "default_drivers")]
    pub drivers: Vec<String>,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_poll_interval_ms() -> u64 {
    40
}
fn default_drivers() -> Vec<String> {
    vec!["auto".to_string()]
}
fn default_braille_devices() -> Vec<String> {
    vec!["usb:".to_string(), "serial:/dev/ttyS0".to_string()]
}
fn default_retry_interval_ms() -> u64 {
    5000
}
fn default_firmness() -> u8 {
    Firmness::Medium as u8
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), poll_interval_ms: default_poll_interval_ms() }
    }
}

impl Default for BrailleConfig {
    fn default() -> Self {
        Self {
            drivers: default_drivers(),
            devices: default_braille_devices(),
            retry_interval_ms: default_retry_interval_ms(),
            legacy_firmware: false,
            firmness: default_firmness(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { drivers: default_drivers(), retry_interval_ms: default_retry_interval_ms() }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl BrailleConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn firmness(&self) -> Firmness {
        Firmness::from_setting(self.firmness)
    }

    /// Link settings for the configured display.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions { legacy_firmware: self.legacy_firmware, ..TransportOptions::default() }
    }
}

impl DriverConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning the defaults
/// if the file does not exist yet.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning the defaults if it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path: path.to_path_buf(), source: e }),
    }
}

/// Writes `config` to `path`, creating the parent directory.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io { path: dir.to_path_buf(), source })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("brld"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("brld"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("brld"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
