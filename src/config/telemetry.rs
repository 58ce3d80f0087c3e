// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ambient telemetry relay configuration

use serde::{Deserialize, Serialize};

/// Default Ambient service endpoint
pub const DEFAULT_AMBIENT_ENDPOINT: &str = "http://ambidata.io";

/// Configuration for forwarding CO2 readings to an Ambient channel.
///
/// The channel id and write key are usually kept out of the file and
/// supplied through `AMBIENT_CHANNEL_ID` and `AMBIENT_WRITE_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable the relay. Default is `false`.
    pub enabled: bool,

    /// Base URL of the Ambient service.
    pub endpoint: String,

    /// Ambient channel identifier.
    pub channel_id: String,

    /// Write key of the channel.
    pub write_key: String,

    /// Seconds between two pushes. Ambient accepts at most 3000 points a
    /// day per channel, so the default is 60.
    pub interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_AMBIENT_ENDPOINT.to_string(),
            channel_id: String::new(),
            write_key: String::new(),
            interval_secs: 60,
        }
    }
}
