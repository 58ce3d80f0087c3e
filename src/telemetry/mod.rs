// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry relay
//!
//! Periodically forwards the latest eCO2 reading to an Ambient IoT channel.
//! The relay only reads the [`ReadingStore`]; it never talks to the sensor.

pub mod ambient;

use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::acquisition::ReadingStore;

pub use ambient::AmbientClient;

/// Forward the latest reading every `interval` until `shutdown` turns true
///
/// Push failures are logged and retried on the next tick. Ticks before the
/// first successful decode are skipped.
pub async fn run_relay(
    client: AmbientClient,
    store: ReadingStore,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!(
        "Telemetry relay started: {} every {:?}",
        client.url(),
        interval
    );

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        match store.snapshot() {
            Some(reading) => {
                if let Err(e) = client.send(&reading).await {
                    warn!("Telemetry push failed: {:#}", e);
                }
            }
            None => debug!("No reading yet, skipping telemetry push"),
        }
    }

    info!("Telemetry relay stopped");
    Ok(())
}
