// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor acquisition module
//!
//! This module drives the request/response cycle with the sensor and keeps
//! the latest decoded reading available to the rest of the application.
//!
//! ## Components
//!
//! - [`Transport`]: byte-stream capability consumed by the poll loop
//! - [`SerialTransport`]: serial port implementation of [`Transport`]
//! - [`ReadingStore`]: latest reading, shared between one writer and many readers
//! - [`PollLoop`] / [`PollHandle`]: the worker thread and its control handle

pub mod daemon;
pub mod serial;
pub mod shared_state;
pub mod transport;

pub use daemon::{
    PollHandle, PollLoop, PollState, PollStats, PollTiming, DEFAULT_POLL_INTERVAL,
    DEFAULT_SETTLE_DELAY,
};
pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
pub use shared_state::{CapabilityError, ReadingStore, TimestampedReading};
pub use transport::Transport;
