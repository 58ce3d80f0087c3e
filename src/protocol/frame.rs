// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request frames sent to the sensor
//!
//! Only the "latest data short" read (address 0x5022) is ever issued, so the
//! request is built once and shared for the lifetime of the process.

use std::ops::Deref;
use std::sync::OnceLock;

use super::checksum::{crc16_modbus, split};

/// Header of the "latest data short" read request
///
/// `0x52 0x42` telegram header, length `0x0005`, command `0x01` (read),
/// address `0x5022` little-endian.
pub const LATEST_SHORT_HEADER: [u8; 7] = [0x52, 0x42, 0x05, 0x00, 0x01, 0x22, 0x50];

/// Size of a complete request on the wire (header + CRC)
pub const COMMAND_FRAME_LEN: usize = LATEST_SHORT_HEADER.len() + 2;

/// Immutable request telegram, header followed by its checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame([u8; COMMAND_FRAME_LEN]);

impl CommandFrame {
    fn with_checksum(header: [u8; 7]) -> Self {
        let mut bytes = [0u8; COMMAND_FRAME_LEN];
        bytes[..header.len()].copy_from_slice(&header);
        bytes[header.len()..].copy_from_slice(&split(crc16_modbus(&header)));
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for CommandFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Get the "latest data short" request frame
///
/// The frame is computed on first use and cached; every call returns the
/// same bytes.
pub fn build_latest_short_command() -> CommandFrame {
    static FRAME: OnceLock<CommandFrame> = OnceLock::new();
    *FRAME.get_or_init(|| CommandFrame::with_checksum(LATEST_SHORT_HEADER))
}
