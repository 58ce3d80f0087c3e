// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Byte-stream transport abstraction
//!
//! The poll loop only needs to write a request, read a response and release
//! the link at the end. Keeping this behind a trait lets the loop run against
//! the serial port in production and against mocks in tests.

use anyhow::Result;

/// Blocking, device-paced byte transport to the sensor
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Write `bytes` to the device, returning the number of bytes written
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read at most `max_len` bytes, returning what arrived before the read
    /// timed out
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Release the underlying link
    fn close(&mut self) -> Result<()>;
}
