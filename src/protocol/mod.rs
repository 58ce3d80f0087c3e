// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OMRON 2JCIE-BU serial protocol
//!
//! The sensor speaks a small binary request/response protocol over USB serial.
//! Every telegram starts with the `0x52 0x42` header, carries a little-endian
//! length field and ends with a CRC-16/Modbus checksum (low byte first).
//!
//! ## Components
//!
//! - [`checksum`]: CRC-16/Modbus computation
//! - [`frame`]: the "latest data short" request frame
//! - [`decoder`]: CO2 and temperature extraction from the response telegram
//!
//! ## Wire layout of a response
//!
//! | Offset | Size | Content                          |
//! |--------|------|----------------------------------|
//! | 0      | 2    | Header `0x52 0x42`               |
//! | 2      | 2    | Length (LE), from offset 4 to CRC|
//! | 4      | 1    | Command                          |
//! | 5      | 2    | Address (LE)                     |
//! | 8      | 2    | Temperature, 0.01 degC (LE, i16) |
//! | 22     | 2    | eCO2, ppm (LE, u16)              |
//! | n-2    | 2    | CRC-16/Modbus (LE)               |

pub mod checksum;
pub mod decoder;
pub mod frame;

pub use checksum::crc16_modbus;
pub use decoder::{ChecksumPolicy, DecodeError, Reading, ResponseDecoder};
pub use frame::{build_latest_short_command, CommandFrame};

/// Start of every telegram exchanged with the sensor
pub const TELEGRAM_HEADER: [u8; 2] = [0x52, 0x42];
