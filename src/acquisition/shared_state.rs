// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared state for the latest sensor reading
//!
//! The poll loop is the only writer; the telemetry relay, the heartbeat and
//! any consumer holding an [`crate::EnvSensor`] read concurrently. CO2 and
//! temperature live behind a single lock so a reader never pairs a value from
//! one cycle with a value from another.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::protocol::Reading;

/// Requested a measurement the "latest data short" telegram does not provide
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0} is not supported by this sensor protocol")]
    Unsupported(&'static str),
}

/// Reading together with the time its decode completed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimestampedReading {
    pub reading: Reading,
    pub timestamp: DateTime<Utc>,
}

/// Thread-safe holder of the most recent reading
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    latest: Arc<RwLock<Option<TimestampedReading>>>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored reading, stamped with the current time
    pub fn set(&self, reading: Reading) {
        self.set_at(reading, Utc::now());
    }

    /// Replace the stored reading with an explicit acquisition time
    ///
    /// A later call always wins, even if its timestamp is older.
    pub fn set_at(&self, reading: Reading, timestamp: DateTime<Utc>) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(TimestampedReading { reading, timestamp });
    }

    /// Consistent copy of the latest reading, `None` before the first decode
    pub fn snapshot(&self) -> Option<TimestampedReading> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latest eCO2 concentration in ppm
    pub fn get_co2(&self) -> Option<u16> {
        self.snapshot().map(|s| s.reading.co2_ppm)
    }

    /// Latest temperature in degrees Celsius
    pub fn get_temperature(&self) -> Option<f64> {
        self.snapshot().map(|s| s.reading.temperature_celsius())
    }

    /// Humidity is never decoded; always fails with [`CapabilityError::Unsupported`]
    pub fn get_humidity(&self) -> Result<f64, CapabilityError> {
        Err(CapabilityError::Unsupported("humidity"))
    }
}
