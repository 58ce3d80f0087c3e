// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial port transport
//!
//! The 2JCIE-BU enumerates as a USB CDC serial device and requires
//! 115200 baud, 8 data bits, no parity, one stop bit and no flow control.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::transport::Transport;

/// Line speed mandated by the sensor
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Transport over a local serial port
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open the serial port
    ///
    /// ### Parameters
    /// * `port_name` - Device path, e.g. `/dev/ttyUSB0` or `COM3`
    /// * `baud_rate` - Line speed, [`DEFAULT_BAUD_RATE`] for the 2JCIE-BU
    /// * `read_timeout` - Upper bound for a single read call
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        info!(
            "Opened serial port {} at {} baud (read timeout {:?})",
            port_name, baud_rate, read_timeout
        );

        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| anyhow!("Serial port {} is closed", self.port_name))
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let port = self.port_mut()?;
        // Drop anything left over from an earlier, partially read response
        port.clear(ClearBuffer::Input)
            .context("Failed to clear serial input buffer")?;
        port.write_all(bytes).context("Failed to write to serial port")?;
        port.flush().context("Failed to flush serial port")?;
        Ok(bytes.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let mut buffer = vec![0u8; max_len];
        let mut filled = 0;

        while filled < max_len {
            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read from serial port"),
            }
        }

        buffer.truncate(filled);
        debug!("Read {} of {} bytes from {}", filled, max_len, self.port_name);
        Ok(buffer)
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.port_name);
        }
        Ok(())
    }
}
