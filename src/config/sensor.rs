// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor link and polling configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::{PollTiming, DEFAULT_BAUD_RATE};
use crate::protocol::decoder::DEFAULT_RESPONSE_LEN;
use crate::protocol::ChecksumPolicy;

/// Configuration for the serial sensor and its poll loop.
///
/// # Example
///
/// ```
/// use envsensor::config::SensorConfig;
///
/// let sensor = SensorConfig {
///     port: "/dev/ttyACM0".to_string(),
///     interval_ms: 5000,
///     ..SensorConfig::default()
/// };
/// assert_eq!(sensor.timing().poll_interval.as_secs(), 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    /// Serial device the sensor is attached to.
    ///
    /// Default is `/dev/ttyUSB0`.
    pub port: String,

    /// Line speed. The 2JCIE-BU only talks at 115200 baud.
    pub baud_rate: u32,

    /// Pause between two poll cycles in milliseconds. Default 1000.
    pub interval_ms: u64,

    /// Wait between sending a request and reading the response in
    /// milliseconds. The sensor needs about one second; default 1000.
    pub settle_delay_ms: u64,

    /// Timeout of a single serial read in milliseconds. Default 1000.
    pub read_timeout_ms: u64,

    /// Number of bytes read per cycle. At least 24; default 30.
    pub read_len: usize,

    /// Handling of response checksums: `accept`, `warn` or `reject`.
    /// Default is `reject`.
    pub checksum_policy: ChecksumPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            interval_ms: 1000,
            settle_delay_ms: 1000,
            read_timeout_ms: 1000,
            read_len: DEFAULT_RESPONSE_LEN,
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

impl SensorConfig {
    pub fn timing(&self) -> PollTiming {
        PollTiming {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            poll_interval: Duration::from_millis(self.interval_ms),
            read_len: self.read_len,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
