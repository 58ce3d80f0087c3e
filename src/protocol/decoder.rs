// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Response telegram decoding
//!
//! The "latest data short" response uses fixed offsets from the vendor memory
//! map. Only temperature (offsets 8..9) and eCO2 (offsets 22..23) are
//! extracted; humidity, light, pressure and the other fields are ignored.
//!
//! Validation of the response's own CRC is controlled by [`ChecksumPolicy`].

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::checksum::crc16_modbus;

/// Smallest buffer that contains every interpreted offset
pub const MIN_RESPONSE_LEN: usize = 24;

/// Nominal number of bytes read from the sensor per cycle
pub const DEFAULT_RESPONSE_LEN: usize = 30;

const TEMPERATURE_OFFSET: usize = 8;
const CO2_OFFSET: usize = 22;
const LENGTH_OFFSET: usize = 2;
/// Bytes preceding the part of the frame counted by the length field
const LENGTH_BASE: usize = 4;
const CRC_LEN: usize = 2;

/// Errors raised while turning a response buffer into a [`Reading`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response too short: {len} bytes, at least {min} required", min = MIN_RESPONSE_LEN)]
    ShortBuffer { len: usize },

    #[error("response checksum mismatch: computed {expected:#06x}, received {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("response declares a {declared}-byte frame but only {len} bytes were read")]
    Unverifiable { declared: usize, len: usize },

    #[error("response declares an invalid length field: {declared}")]
    InvalidLength { declared: usize },
}

/// Decoded measurement from one response telegram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// eCO2 concentration in ppm
    pub co2_ppm: u16,
    /// Temperature in hundredths of a degree Celsius
    pub temperature_centi: i16,
}

impl Reading {
    /// Temperature in degrees Celsius (0.01 resolution)
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature_centi) / 100.0
    }
}

/// What to do with a response whose checksum cannot be confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Skip validation entirely
    Accept,
    /// Validate, log problems and keep the reading
    Warn,
    /// Validate and drop the reading on any problem
    #[default]
    Reject,
}

impl fmt::Display for ChecksumPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChecksumPolicy::Accept => "accept",
            ChecksumPolicy::Warn => "warn",
            ChecksumPolicy::Reject => "reject",
        };
        f.write_str(name)
    }
}

impl FromStr for ChecksumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Ok(ChecksumPolicy::Accept),
            "warn" => Ok(ChecksumPolicy::Warn),
            "reject" => Ok(ChecksumPolicy::Reject),
            other => Err(format!(
                "unknown checksum policy '{}', expected accept, warn or reject",
                other
            )),
        }
    }
}

/// Extract the reading from a response buffer without any checksum handling
pub fn decode(buffer: &[u8]) -> Result<Reading, DecodeError> {
    if buffer.len() < MIN_RESPONSE_LEN {
        return Err(DecodeError::ShortBuffer { len: buffer.len() });
    }

    let temperature_centi =
        i16::from_le_bytes([buffer[TEMPERATURE_OFFSET], buffer[TEMPERATURE_OFFSET + 1]]);
    let co2_ppm = u16::from_le_bytes([buffer[CO2_OFFSET], buffer[CO2_OFFSET + 1]]);

    Ok(Reading {
        co2_ppm,
        temperature_centi,
    })
}

/// Check the trailing CRC of the frame contained in `buffer`
///
/// The frame length is taken from the little-endian length field at offset 2.
/// Bytes after the declared frame are ignored.
pub fn verify_checksum(buffer: &[u8]) -> Result<(), DecodeError> {
    if buffer.len() < LENGTH_BASE {
        return Err(DecodeError::ShortBuffer { len: buffer.len() });
    }

    let declared =
        usize::from(u16::from_le_bytes([buffer[LENGTH_OFFSET], buffer[LENGTH_OFFSET + 1]]));
    if declared < CRC_LEN {
        return Err(DecodeError::InvalidLength { declared });
    }

    let frame_len = LENGTH_BASE + declared;
    if frame_len > buffer.len() {
        return Err(DecodeError::Unverifiable {
            declared: frame_len,
            len: buffer.len(),
        });
    }

    let crc_at = frame_len - CRC_LEN;
    let actual = u16::from_le_bytes([buffer[crc_at], buffer[crc_at + 1]]);
    let expected = crc16_modbus(&buffer[..crc_at]);
    if expected != actual {
        return Err(DecodeError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}

/// Response decoder applying a [`ChecksumPolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder {
    policy: ChecksumPolicy,
}

impl ResponseDecoder {
    pub fn new(policy: ChecksumPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ChecksumPolicy {
        self.policy
    }

    /// Decode a response buffer
    ///
    /// Buffers shorter than [`MIN_RESPONSE_LEN`] always fail with
    /// [`DecodeError::ShortBuffer`], whatever the policy.
    pub fn decode(&self, buffer: &[u8]) -> Result<Reading, DecodeError> {
        let reading = decode(buffer)?;

        match self.policy {
            ChecksumPolicy::Accept => {}
            ChecksumPolicy::Warn => match verify_checksum(buffer) {
                Ok(()) => {}
                Err(e @ DecodeError::Unverifiable { .. }) => {
                    debug!("Accepting response without checksum check: {}", e)
                }
                Err(e) => warn!("Accepting response despite failed check: {}", e),
            },
            ChecksumPolicy::Reject => verify_checksum(buffer)?,
        }

        Ok(reading)
    }
}
