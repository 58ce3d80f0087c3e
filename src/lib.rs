//! envsensor library
//!
//! This library polls an OMRON 2JCIE-BU USB environment sensor over its
//! serial protocol and keeps the latest eCO2 and temperature readings
//! available to any number of consumers.

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod protocol;
pub mod sensor;
pub mod telemetry;

pub use acquisition::{CapabilityError, PollState, ReadingStore, TimestampedReading};
pub use protocol::{ChecksumPolicy, DecodeError, Reading};
pub use sensor::EnvSensor;
