//! Hook Configuration
//!
//! Which device a hook attaches to, which daemon it talks to and where lock
//! files live.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. Environment variables (`HFPAG_DEVICE`, `HFPAG_SERVICE`, `HFPAG_LOCK_DIR`)
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! device = "AA:BB:CC:DD:EE:FF"
//! service = "org.bluealsa"
//! lock_dir = "/run/user/1000"
//! ```
//!
//! Unknown keys are rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::BluetoothAddress;
use crate::bus::DEFAULT_SERVICE;
use crate::session::default_lock_dir;

/// Environment variable overriding the device address
pub const ENV_DEVICE: &str = "HFPAG_DEVICE";
/// Environment variable overriding the service name
pub const ENV_SERVICE: &str = "HFPAG_SERVICE";
/// Environment variable overriding the lock directory
pub const ENV_LOCK_DIR: &str = "HFPAG_LOCK_DIR";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// TOML Structure
// =============================================================================

/// Hook configuration file contents
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookToml {
    /// Remote device address, `00:00:00:00:00:00` for any
    pub device: Option<String>,

    /// BlueALSA service name
    pub service: Option<String>,

    /// Directory for lock files
    pub lock_dir: Option<PathBuf>,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved hook configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookConfig {
    /// Device to attach to ([`BluetoothAddress::ANY`] picks the most recent)
    pub device: BluetoothAddress,
    /// BlueALSA service name
    pub service: String,
    /// Lock directory; `None` resolves to [`default_lock_dir`]
    pub lock_dir: Option<PathBuf>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            device: BluetoothAddress::ANY,
            service: DEFAULT_SERVICE.to_string(),
            lock_dir: None,
        }
    }
}

impl HookConfig {
    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let toml: HookToml = toml::from_str(content)?;
        let mut config = Self::default();
        config.apply_toml(&toml)?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Lock directory to use
    #[must_use]
    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(default_lock_dir)
    }

    /// Apply values present in a TOML document
    pub fn apply_toml(&mut self, toml: &HookToml) -> Result<(), ConfigError> {
        if let Some(device) = &toml.device {
            self.device = parse_device(device)?;
        }
        if let Some(service) = &toml.service {
            self.service = validate_service(service)?;
        }
        if let Some(dir) = &toml.lock_dir {
            self.lock_dir = Some(dir.clone());
        }
        Ok(())
    }

    /// Apply `HFPAG_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup(ENV_DEVICE) {
            self.device = parse_device(&device)?;
        }
        if let Some(service) = lookup(ENV_SERVICE) {
            self.service = validate_service(&service)?;
        }
        if let Some(dir) = lookup(ENV_LOCK_DIR) {
            self.lock_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}

fn parse_device(value: &str) -> Result<BluetoothAddress, ConfigError> {
    value
        .parse::<BluetoothAddress>()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))
}

fn validate_service(value: &str) -> Result<String, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::ValidationError(
            "service name must not be empty".to_string(),
        ));
    }
    Ok(value.to_string())
}

/// Load configuration from defaults, an optional file, then the environment
///
/// # Errors
///
/// Returns an error if the given file cannot be read or parsed, or if any
/// value fails validation.
pub fn load_config(path: Option<&Path>) -> Result<HookConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// [`load_config`] with environment overrides read through `lookup`
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<HookConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = HookConfig::default();

    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let toml: HookToml = toml::from_str(&content)?;
        config.apply_toml(&toml)?;

        tracing::info!(path = %path.display(), "Loaded hook configuration from file");
    }

    config.apply_env_with(lookup)?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
