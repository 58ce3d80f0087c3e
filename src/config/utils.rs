// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};
use url::Url;

use super::Config;
use crate::protocol::decoder::MIN_RESPONSE_LEN;

/// JSON schema embedded in the binary
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./envsensor --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validate a JSON document against the embedded configuration schema
pub(crate) fn validate_against_schema(value: &serde_json::Value) -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let validator = jsonschema::draft202012::options()
        .should_validate_formats(true)
        .build(&schema)?;

    if let Err(error) = validator.validate(value) {
        anyhow::bail!("Configuration validation failed: {}", error);
    }

    Ok(())
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Serial port**: the device path must not be empty
/// - **Read size**: at least the 24 bytes the decoder needs
/// - **Telemetry**: when enabled, the channel id must be numeric, the write
///   key present and the endpoint an http(s) URL
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.sensor.port.trim().is_empty() {
        anyhow::bail!("Sensor serial port must not be empty");
    }

    if config.sensor.read_len < MIN_RESPONSE_LEN {
        anyhow::bail!(
            "Sensor read_len {} is below the {} bytes needed to decode a response",
            config.sensor.read_len,
            MIN_RESPONSE_LEN
        );
    }

    if config.sensor.settle_delay_ms < 1000 {
        warn!(
            "Settle delay of {} ms is shorter than the 1 s the sensor needs, responses may be incomplete",
            config.sensor.settle_delay_ms
        );
    }

    let telemetry = &config.telemetry;
    if telemetry.enabled {
        if telemetry.channel_id.is_empty() {
            anyhow::bail!("Telemetry enabled without a channel id (set AMBIENT_CHANNEL_ID)");
        }
        if !telemetry.channel_id.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!(
                "Telemetry channel id must be numeric: {}",
                telemetry.channel_id
            );
        }
        if telemetry.write_key.is_empty() {
            anyhow::bail!("Telemetry enabled without a write key (set AMBIENT_WRITE_KEY)");
        }

        let endpoint = Url::parse(&telemetry.endpoint)
            .with_context(|| format!("Invalid telemetry endpoint: {}", telemetry.endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "Telemetry endpoint must use http or https: {}",
                telemetry.endpoint
            );
        }
    }

    Ok(())
}
