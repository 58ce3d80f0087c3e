// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Helpers shared by the integration tests

#![allow(dead_code)]

use anyhow::Result;
use envsensor::acquisition::{PollTiming, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 30-byte "latest data short" response: 26.67 degC and 440 ppm eCO2
pub const EXAMPLE_RESPONSE: [u8; 30] = [
    0x52, 0x42, 0x1A, 0x00, 0x01, 0x22, 0x50, 0x07, 0x6B, 0x0A, 0xA0, 0x0F, 0x64, 0x00, 0x02, 0x76,
    0x0F, 0x00, 0xAC, 0x0D, 0x0A, 0x00, 0xB8, 0x01, 0x58, 0x1B, 0x28, 0x0A, 0x02, 0x0F,
];

/// Counters observable after the transport has moved into the poll loop
#[derive(Debug, Clone, Default)]
pub struct TransportCounters {
    pub writes: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl TransportCounters {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Transport answering every request with a fixed response
pub struct FakeTransport {
    response: Vec<u8>,
    counters: TransportCounters,
}

impl FakeTransport {
    pub fn new(response: &[u8]) -> (Self, TransportCounters) {
        let counters = TransportCounters::default();
        (
            Self {
                response: response.to_vec(),
                counters: counters.clone(),
            },
            counters,
        )
    }
}

impl Transport for FakeTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(bytes.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.iter().copied().take(max_len).collect())
    }

    fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fast_timing() -> PollTiming {
    PollTiming {
        settle_delay: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
        read_len: 30,
    }
}

/// Poll `condition` until it holds or five seconds elapse
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
