// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Consumer-facing sensor handle
//!
//! [`EnvSensor`] opens the link, runs the poll loop in the background and
//! answers accessor calls from the latest reading.
//!
//! ```no_run
//! use envsensor::config::SensorConfig;
//! use envsensor::EnvSensor;
//!
//! let mut sensor = EnvSensor::open(&SensorConfig::default())?;
//! sensor.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! println!("eCO2: {:?}", sensor.get_co2());
//! sensor.stop()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{bail, Result};
use log::warn;

use crate::acquisition::{
    CapabilityError, PollHandle, PollLoop, PollState, PollStats, PollTiming, ReadingStore,
    SerialTransport, Transport,
};
use crate::config::SensorConfig;
use crate::protocol::{ChecksumPolicy, ResponseDecoder};

enum Lifecycle {
    Idle(PollLoop),
    Started(PollHandle),
    Finished,
}

/// CO2/temperature sensor polled in the background
pub struct EnvSensor {
    lifecycle: Lifecycle,
    store: ReadingStore,
}

impl EnvSensor {
    /// Open the serial link described by `config`
    ///
    /// Failing to open the port is fatal and returned immediately.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        let transport =
            SerialTransport::open(&config.port, config.baud_rate, config.read_timeout())?;
        Ok(Self::with_transport(
            Box::new(transport),
            config.checksum_policy,
            config.timing(),
        ))
    }

    /// Build a sensor on top of an already open transport
    pub fn with_transport(
        transport: Box<dyn Transport>,
        checksum_policy: ChecksumPolicy,
        timing: PollTiming,
    ) -> Self {
        let store = ReadingStore::new();
        let poll_loop = PollLoop::new(
            transport,
            ResponseDecoder::new(checksum_policy),
            store.clone(),
            timing,
        );
        Self {
            lifecycle: Lifecycle::Idle(poll_loop),
            store,
        }
    }

    /// Start polling in the background
    pub fn start(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Finished) {
            Lifecycle::Idle(poll_loop) => {
                self.lifecycle = Lifecycle::Started(poll_loop.start()?);
                Ok(())
            }
            Lifecycle::Started(handle) => {
                warn!("Sensor poll loop is already running");
                self.lifecycle = Lifecycle::Started(handle);
                Ok(())
            }
            Lifecycle::Finished => bail!("Sensor has been stopped and its link closed"),
        }
    }

    /// Ask the poll loop to stop without waiting for it
    pub fn request_stop(&self) {
        if let Lifecycle::Started(handle) = &self.lifecycle {
            handle.request_stop();
        }
    }

    /// Stop polling and wait until the serial link is closed
    ///
    /// Returns once the current iteration has finished. Calling it on a
    /// sensor that was never started or is already stopped does nothing.
    pub fn stop(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Finished) {
            Lifecycle::Started(handle) => handle.stop(),
            Lifecycle::Idle(poll_loop) => {
                self.lifecycle = Lifecycle::Idle(poll_loop);
                Ok(())
            }
            Lifecycle::Finished => Ok(()),
        }
    }

    /// Poll loop state, `None` before [`EnvSensor::start`]
    pub fn state(&self) -> Option<PollState> {
        match &self.lifecycle {
            Lifecycle::Idle(_) => None,
            Lifecycle::Started(handle) => Some(handle.state()),
            Lifecycle::Finished => Some(PollState::Stopped),
        }
    }

    pub fn stats(&self) -> Option<PollStats> {
        match &self.lifecycle {
            Lifecycle::Started(handle) => Some(handle.stats()),
            _ => None,
        }
    }

    /// Shared store with the latest reading
    pub fn store(&self) -> ReadingStore {
        self.store.clone()
    }

    /// Latest eCO2 concentration in ppm
    pub fn get_co2(&self) -> Option<u16> {
        self.store.get_co2()
    }

    /// Latest temperature in degrees Celsius
    pub fn get_temperature(&self) -> Option<f64> {
        self.store.get_temperature()
    }

    /// Humidity is not part of the decoded telegram
    pub fn get_humidity(&self) -> Result<f64, CapabilityError> {
        self.store.get_humidity()
    }
}

impl Drop for EnvSensor {
    fn drop(&mut self) {
        // The worker closes the link on its own once it sees the request
        self.request_stop();
    }
}
