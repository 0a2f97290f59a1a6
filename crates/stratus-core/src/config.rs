//! Configuration for stratus
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

/// Main configuration for stratus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratusConfig {
    /// Provisioning configuration
    #[serde(default)]
    pub provision: ProvisionConfig,

    /// Readiness probe configuration
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl StratusConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.provision.validate()?;
        self.readiness.validate()?;
        Ok(())
    }
}

/// Provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Interval between control-plane status polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Suspension window after a control-plane 5xx (milliseconds)
    #[serde(default = "default_throttle_cooldown_ms")]
    pub throttle_cooldown_ms: u64,

    /// Default deadline for bulk teardown (milliseconds)
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Window inside which repeated stop requests for one address are ignored
    /// (milliseconds)
    #[serde(default = "default_stop_request_window_ms")]
    pub stop_request_window_ms: u64,

    /// Prefix for generated machine names
    #[serde(default = "default_machine_name_prefix")]
    pub machine_name_prefix: String,
}

fn default_poll_interval_ms() -> u64 {
    MACHINE_POLL_INTERVAL_MS_DEFAULT
}

fn default_throttle_cooldown_ms() -> u64 {
    THROTTLE_COOLDOWN_MS_DEFAULT
}

fn default_shutdown_timeout_ms() -> u64 {
    SHUTDOWN_TIMEOUT_MS_DEFAULT
}

fn default_stop_request_window_ms() -> u64 {
    STOP_REQUEST_WINDOW_MS_DEFAULT
}

fn default_machine_name_prefix() -> String {
    MACHINE_NAME_PREFIX_DEFAULT.to_string()
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            throttle_cooldown_ms: default_throttle_cooldown_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            stop_request_window_ms: default_stop_request_window_ms(),
            machine_name_prefix: default_machine_name_prefix(),
        }
    }
}

impl ProvisionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "provision.poll_interval_ms".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.poll_interval_ms > MACHINE_POLL_INTERVAL_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "provision.poll_interval_ms".into(),
                reason: format!(
                    "{} exceeds limit {}",
                    self.poll_interval_ms, MACHINE_POLL_INTERVAL_MS_MAX
                ),
            });
        }
        if self.throttle_cooldown_ms > THROTTLE_COOLDOWN_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "provision.throttle_cooldown_ms".into(),
                reason: format!(
                    "{} exceeds limit {}",
                    self.throttle_cooldown_ms, THROTTLE_COOLDOWN_MS_MAX
                ),
            });
        }
        if self.machine_name_prefix.is_empty() {
            return Err(Error::InvalidConfiguration {
                field: "provision.machine_name_prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.machine_name_prefix.len() > MACHINE_NAME_LENGTH_BYTES_MAX / 2 {
            return Err(Error::InvalidConfiguration {
                field: "provision.machine_name_prefix".into(),
                reason: format!(
                    "length {} exceeds limit {}",
                    self.machine_name_prefix.len(),
                    MACHINE_NAME_LENGTH_BYTES_MAX / 2
                ),
            });
        }
        Ok(())
    }
}

/// Readiness probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Port of the machine-local service probed for readiness
    #[serde(default = "default_readiness_port")]
    pub port: u16,

    /// Path probed for readiness
    #[serde(default = "default_readiness_path")]
    pub path: String,

    /// Per-request timeout for a single probe (milliseconds)
    #[serde(default = "default_readiness_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_readiness_port() -> u16 {
    READINESS_PORT_DEFAULT
}

fn default_readiness_path() -> String {
    READINESS_PATH_DEFAULT.to_string()
}

fn default_readiness_request_timeout_ms() -> u64 {
    READINESS_REQUEST_TIMEOUT_MS_DEFAULT
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            port: default_readiness_port(),
            path: default_readiness_path(),
            request_timeout_ms: default_readiness_request_timeout_ms(),
        }
    }
}

impl ReadinessConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::InvalidConfiguration {
                field: "readiness.port".into(),
                reason: "must not be 0".into(),
            });
        }
        if !self.path.starts_with('/') {
            return Err(Error::InvalidConfiguration {
                field: "readiness.path".into(),
                reason: "must start with '/'".into(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "readiness.request_timeout_ms".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
