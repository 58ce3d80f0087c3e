// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CRC-16/Modbus checksum
//!
//! The 2JCIE-BU protects both requests and responses with the Modbus flavour
//! of CRC-16 (reflected polynomial 0xA001, initial value 0xFFFF, no final XOR).
//! The checksum travels on the wire low byte first.

/// Initial value of the CRC register
pub const CRC16_MODBUS_INIT: u16 = 0xFFFF;

/// Reflected form of the 0x8005 polynomial
pub const CRC16_MODBUS_POLYNOMIAL: u16 = 0xA001;

/// Compute the CRC-16/Modbus of `data`
pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc = CRC16_MODBUS_INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC16_MODBUS_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Split a checksum into its wire representation `[low, high]`
pub fn split(crc: u16) -> [u8; 2] {
    crc.to_le_bytes()
}
