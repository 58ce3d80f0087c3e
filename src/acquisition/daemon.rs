// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor poll loop
//!
//! A dedicated worker thread owns the transport and repeats the
//! request/settle/read/decode cycle until asked to stop:
//!
//! ```text
//! Running --request_stop()--> Stopping --transport closed--> Stopped
//! ```
//!
//! Stop is cooperative. The flag is checked once per iteration, after the
//! poll interval sleep, so shutdown may take up to
//! `settle_delay + read time + poll_interval`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info, warn};

use crate::acquisition::{ReadingStore, Transport};
use crate::protocol::decoder::DEFAULT_RESPONSE_LEN;
use crate::protocol::{build_latest_short_command, CommandFrame, ResponseDecoder};

/// Time the sensor needs after a request before its response is available
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Pause between two poll cycles
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing and sizing of a poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// Maximum number of response bytes read per cycle
    pub read_len: usize,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_len: DEFAULT_RESPONSE_LEN,
        }
    }
}

/// Lifecycle of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Stopping,
    Stopped,
}

/// Counters describing the loop's activity so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub readings: u64,
    pub decode_failures: u64,
    pub transport_failures: u64,
}

#[derive(Debug, Default)]
struct PollCounters {
    cycles: AtomicU64,
    readings: AtomicU64,
    decode_failures: AtomicU64,
    transport_failures: AtomicU64,
}

impl PollCounters {
    fn snapshot(&self) -> PollStats {
        PollStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            readings: self.readings.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}

/// Poll loop ready to be started on its own thread
pub struct PollLoop {
    transport: Box<dyn Transport>,
    decoder: ResponseDecoder,
    store: ReadingStore,
    timing: PollTiming,
    frame: CommandFrame,
    stop_requested: Arc<AtomicBool>,
    state: Arc<Mutex<PollState>>,
    counters: Arc<PollCounters>,
}

impl PollLoop {
    /// Create a poll loop
    ///
    /// ### Parameters
    /// * `transport` - Open link to the sensor, owned by the loop from now on
    /// * `decoder` - Response decoder with its checksum policy
    /// * `store` - Store receiving every successful reading
    /// * `timing` - Settle delay, poll interval and read size
    pub fn new(
        transport: Box<dyn Transport>,
        decoder: ResponseDecoder,
        store: ReadingStore,
        timing: PollTiming,
    ) -> Self {
        Self {
            transport,
            decoder,
            store,
            timing,
            frame: build_latest_short_command(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(PollState::Running)),
            counters: Arc::new(PollCounters::default()),
        }
    }

    /// Spawn the worker thread; the loop is `Running` from here on
    pub fn start(self) -> Result<PollHandle> {
        let stop_requested = self.stop_requested.clone();
        let state = self.state.clone();
        let counters = self.counters.clone();

        let thread = thread::Builder::new()
            .name("envsensor-poll".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn sensor poll thread")?;

        Ok(PollHandle {
            stop_requested,
            state,
            counters,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        info!(
            "Sensor poll loop started (settle delay {:?}, interval {:?}, read {} bytes, checksum {})",
            self.timing.settle_delay,
            self.timing.poll_interval,
            self.timing.read_len,
            self.decoder.policy()
        );

        loop {
            self.cycle();
            thread::sleep(self.timing.poll_interval);

            if self.stop_requested.load(Ordering::SeqCst) {
                self.set_state(PollState::Stopping);
                break;
            }
        }

        if let Err(e) = self.transport.close() {
            error!("Failed to close sensor transport: {:#}", e);
        }
        self.set_state(PollState::Stopped);
        info!("Sensor poll loop stopped");
    }

    fn cycle(&mut self) {
        let cycle = self.counters.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let response = match self.exchange() {
            Ok(response) => response,
            Err(e) => {
                self.counters
                    .transport_failures
                    .fetch_add(1, Ordering::Relaxed);
                error!("Sensor exchange failed on cycle {}: {:#}", cycle, e);
                return;
            }
        };

        match self.decoder.decode(&response) {
            Ok(reading) => {
                self.store.set(reading);
                self.counters.readings.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cycle {}: eCO2 {} ppm, temperature {:.2} degC",
                    cycle,
                    reading.co2_ppm,
                    reading.temperature_celsius()
                );
            }
            Err(e) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Skipping cycle {}, keeping previous reading: {}", cycle, e);
            }
        }
    }

    fn exchange(&mut self) -> Result<Vec<u8>> {
        let expected = self.frame.len();
        let written = self
            .transport
            .write(self.frame.as_bytes())
            .context("Failed to send request")?;
        if written != expected {
            bail!("Short write: {} of {} bytes sent", written, expected);
        }

        thread::sleep(self.timing.settle_delay);

        self.transport
            .read(self.timing.read_len)
            .context("Failed to read response")
    }

    fn set_state(&self, next: PollState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Control handle of a running poll loop
pub struct PollHandle {
    stop_requested: Arc<AtomicBool>,
    state: Arc<Mutex<PollState>>,
    counters: Arc<PollCounters>,
    thread: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Ask the loop to stop after its current iteration
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            info!("Stopping sensor poll loop");
        }
    }

    pub fn state(&self) -> PollState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> PollStats {
        self.counters.snapshot()
    }

    /// Wait for the worker thread to finish
    pub fn join(mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("Sensor poll thread panicked")),
            None => Ok(()),
        }
    }

    /// Request a stop and wait until the transport has been released
    pub fn stop(self) -> Result<()> {
        self.request_stop();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::transport::MockTransport;
    use crate::protocol::ChecksumPolicy;
    use std::time::Instant;

    const EXAMPLE_RESPONSE: [u8; 30] = [
        0x52, 0x42, 0x1A, 0x00, 0x01, 0x22, 0x50, 0x07, 0x6B, 0x0A, 0xA0, 0x0F, 0x64, 0x00, 0x02,
        0x76, 0x0F, 0x00, 0xAC, 0x0D, 0x0A, 0x00, 0xB8, 0x01, 0x58, 0x1B, 0x28, 0x0A, 0x02, 0x0F,
    ];

    fn fast_timing() -> PollTiming {
        PollTiming {
            settle_delay: Duration::from_millis(5),
            poll_interval: Duration::from_millis(5),
            read_len: 30,
        }
    }

    fn wait_for(handle: &PollHandle, condition: impl Fn(PollStats) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition(handle.stats()) {
            assert!(Instant::now() < deadline, "timed out, stats {:?}", handle.stats());
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_successful_cycle_updates_store() {
        let mut transport = MockTransport::new();
        transport
            .expect_write()
            .withf(|bytes| bytes.to_vec() == vec![0x52, 0x42, 0x05, 0x00, 0x01, 0x22, 0x50, 0xE2, 0xBB])
            .returning(|bytes| Ok(bytes.len()));
        transport
            .expect_read()
            .withf(|max_len| *max_len == 30)
            .returning(|_| Ok(EXAMPLE_RESPONSE.to_vec()));
        transport.expect_close().times(1).returning(|| Ok(()));

        let store = ReadingStore::new();
        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::new(ChecksumPolicy::Reject),
            store.clone(),
            fast_timing(),
        )
        .start()
        .unwrap();

        assert_eq!(handle.state(), PollState::Running);
        wait_for(&handle, |stats| stats.readings >= 2);
        assert_eq!(store.get_co2(), Some(440));
        assert_eq!(store.get_temperature(), Some(26.67));

        handle.request_stop();
        let state = handle.state.clone();
        handle.join().unwrap();
        assert_eq!(*state.lock().unwrap(), PollState::Stopped);
    }

    #[test]
    fn test_short_response_keeps_previous_reading() {
        let mut transport = MockTransport::new();
        transport.expect_write().returning(|bytes| Ok(bytes.len()));
        let mut calls = 0;
        transport.expect_read().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(EXAMPLE_RESPONSE.to_vec())
            } else {
                Ok(EXAMPLE_RESPONSE[..12].to_vec())
            }
        });
        transport.expect_close().times(1).returning(|| Ok(()));

        let store = ReadingStore::new();
        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::default(),
            store.clone(),
            fast_timing(),
        )
        .start()
        .unwrap();

        wait_for(&handle, |stats| stats.decode_failures >= 3);
        let stats = handle.stats();
        assert_eq!(stats.readings, 1);
        assert_eq!(stats.transport_failures, 0);
        assert_eq!(store.get_co2(), Some(440));

        handle.stop().unwrap();
    }

    #[test]
    fn test_transport_errors_do_not_stop_the_loop() {
        let mut transport = MockTransport::new();
        transport.expect_write().returning(|bytes| Ok(bytes.len()));
        transport
            .expect_read()
            .returning(|_| Err(anyhow!("device unplugged")));
        transport.expect_close().times(1).returning(|| Ok(()));

        let store = ReadingStore::new();
        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::default(),
            store.clone(),
            fast_timing(),
        )
        .start()
        .unwrap();

        wait_for(&handle, |stats| stats.transport_failures >= 3);
        assert_eq!(handle.state(), PollState::Running);
        assert_eq!(store.get_co2(), None);

        handle.stop().unwrap();
    }

    #[test]
    fn test_short_write_is_a_transport_failure() {
        let mut transport = MockTransport::new();
        transport.expect_write().returning(|_| Ok(4));
        transport.expect_read().never();
        transport.expect_close().times(1).returning(|| Ok(()));

        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::default(),
            ReadingStore::new(),
            fast_timing(),
        )
        .start()
        .unwrap();

        wait_for(&handle, |stats| stats.transport_failures >= 1);
        assert_eq!(handle.stats().readings, 0);
        handle.stop().unwrap();
    }

    #[test]
    fn test_stop_latency_is_bounded() {
        let timing = PollTiming {
            settle_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(50),
            read_len: 30,
        };

        let mut transport = MockTransport::new();
        transport.expect_write().returning(|bytes| Ok(bytes.len()));
        transport
            .expect_read()
            .returning(|_| Ok(EXAMPLE_RESPONSE.to_vec()));
        transport.expect_close().times(1).returning(|| Ok(()));

        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::default(),
            ReadingStore::new(),
            timing,
        )
        .start()
        .unwrap();

        wait_for(&handle, |stats| stats.cycles >= 1);
        let requested = Instant::now();
        handle.stop().unwrap();
        let elapsed = requested.elapsed();

        // settle + read + interval, with headroom for scheduling
        let bound = timing.settle_delay + timing.poll_interval + Duration::from_millis(400);
        assert!(elapsed < bound, "stop took {:?}", elapsed);
    }

    #[test]
    fn test_close_error_still_reaches_stopped() {
        let mut transport = MockTransport::new();
        transport.expect_write().returning(|bytes| Ok(bytes.len()));
        transport
            .expect_read()
            .returning(|_| Ok(EXAMPLE_RESPONSE.to_vec()));
        transport
            .expect_close()
            .times(1)
            .returning(|| Err(anyhow!("already gone")));

        let handle = PollLoop::new(
            Box::new(transport),
            ResponseDecoder::default(),
            ReadingStore::new(),
            fast_timing(),
        )
        .start()
        .unwrap();

        handle.request_stop();
        handle.request_stop();
        let state = handle.state.clone();
        handle.join().unwrap();
        assert_eq!(*state.lock().unwrap(), PollState::Stopped);
    }
}
