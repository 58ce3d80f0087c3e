// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the envsensor daemon
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `sensor`: serial port and poll loop settings
//! - `telemetry`: Ambient relay settings
//!
//! ## Usage
//!
//! ```no_run
//! use envsensor::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line and environment overrides
//! config.apply_args(
//!     Some("/dev/ttyACM0".to_string()), // Serial port
//!     Some(2000),                       // Poll interval in ms
//!     None,                             // Checksum policy
//!     false,                            // Force telemetry on
//!     None,                             // Ambient channel id
//!     None,                             // Ambient write key
//! );
//! config.apply_env();
//! config.validate().unwrap();
//!
//! println!("Polling {}", config.sensor.port);
//! ```

pub mod sensor;
pub mod telemetry;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::protocol::ChecksumPolicy;

pub use sensor::SensorConfig;
pub use telemetry::{TelemetryConfig, DEFAULT_AMBIENT_ENDPOINT};
pub use utils::{output_config_schema, validate_specific_rules};

/// Environment variable holding the Ambient channel id
pub const ENV_AMBIENT_CHANNEL_ID: &str = "AMBIENT_CHANNEL_ID";
/// Environment variable holding the Ambient write key
pub const ENV_AMBIENT_WRITE_KEY: &str = "AMBIENT_WRITE_KEY";
/// Environment variable overriding the serial port
pub const ENV_SENSOR_PORT: &str = "ENVSENSOR_PORT";

/// Root configuration structure.
///
/// Each section falls back to its defaults when absent from the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Serial link and poll loop settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Ambient relay settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// validation produces a `<name>.sample.yaml` next to it and an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // Validate the raw document first so schema errors are reported
        // before serde defaults hide them
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = utils::validate_against_schema(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            return Err(err);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Check the in-memory configuration with the same rules as [`Config::from_file`]
    ///
    /// Useful after command line or environment overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        let json_value =
            serde_json::to_value(self).context("Failed to convert configuration to JSON")?;
        utils::validate_against_schema(&json_value)?;
        utils::validate_specific_rules(self)
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were actually provided override the configuration.
    ///
    /// # Parameters
    ///
    /// * `port` - Serial device of the sensor
    /// * `interval_ms` - Pause between poll cycles
    /// * `checksum_policy` - Response checksum handling
    /// * `telemetry` - If true, forces the Ambient relay on
    /// * `channel_id` - Ambient channel id
    /// * `write_key` - Ambient write key
    pub fn apply_args(
        &mut self,
        port: Option<String>,
        interval_ms: Option<u64>,
        checksum_policy: Option<ChecksumPolicy>,
        telemetry: bool,
        channel_id: Option<String>,
        write_key: Option<String>,
    ) {
        if let Some(port) = port {
            debug!("Overriding serial port from command line: {}", port);
            self.sensor.port = port;
        }
        if let Some(interval_ms) = interval_ms {
            debug!("Overriding poll interval from command line: {}ms", interval_ms);
            self.sensor.interval_ms = interval_ms;
        }
        if let Some(policy) = checksum_policy {
            debug!("Overriding checksum policy from command line: {}", policy);
            self.sensor.checksum_policy = policy;
        }
        if telemetry {
            self.telemetry.enabled = true;
        }
        if let Some(channel_id) = channel_id {
            debug!("Overriding Ambient channel id from command line: {}", channel_id);
            self.telemetry.channel_id = channel_id;
        }
        if let Some(write_key) = write_key {
            debug!("Overriding Ambient write key from command line");
            self.telemetry.write_key = write_key;
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides using `lookup` to resolve environment variables
    ///
    /// Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(port) = lookup(ENV_SENSOR_PORT) {
            debug!("Overriding serial port from {}: {}", ENV_SENSOR_PORT, port);
            self.sensor.port = port;
        }
        if let Some(channel_id) = lookup(ENV_AMBIENT_CHANNEL_ID) {
            debug!("Overriding Ambient channel id from {}", ENV_AMBIENT_CHANNEL_ID);
            self.telemetry.channel_id = channel_id;
        }
        if let Some(write_key) = lookup(ENV_AMBIENT_WRITE_KEY) {
            debug!("Overriding Ambient write key from {}", ENV_AMBIENT_WRITE_KEY);
            self.telemetry.write_key = write_key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.sensor.port, "/dev/ttyUSB0");
        assert_eq!(config.sensor.baud_rate, 115_200);
        assert_eq!(config.sensor.read_len, 30);
        assert_eq!(config.sensor.checksum_policy, ChecksumPolicy::Reject);
        assert!(!config.telemetry.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_from() {
        let vars: HashMap<&str, &str> = [
            (ENV_AMBIENT_CHANNEL_ID, "12345"),
            (ENV_AMBIENT_WRITE_KEY, "abcdef0123456789"),
            (ENV_SENSOR_PORT, ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.telemetry.channel_id, "12345");
        assert_eq!(config.telemetry.write_key, "abcdef0123456789");
        // Empty values do not override
        assert_eq!(config.sensor.port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_telemetry_requires_credentials() {
        let mut config = Config::default();
        config.apply_args(None, None, None, true, None, None);
        assert!(config.validate().is_err());

        config.apply_args(
            None,
            None,
            None,
            true,
            Some("12345".to_string()),
            Some("key".to_string()),
        );
        assert!(config.validate().is_ok());

        config.telemetry.channel_id = "channel-one".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_small_read_len() {
        let mut config = Config::default();
        config.sensor.read_len = 16;
        assert!(config.validate().is_err());
    }
}
