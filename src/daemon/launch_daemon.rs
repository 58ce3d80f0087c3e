// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use log::{debug, error, info};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::acquisition::ReadingStore;
use crate::config::Config;
use crate::sensor::EnvSensor;
use crate::telemetry::{self, AmbientClient};

/// Interval of the heartbeat log line with the latest reading
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Represents the set of background tasks making up the service
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: watch::Sender<bool>,
    sensor: Option<EnvSensor>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Daemon {
            tasks: Vec::new(),
            shutdown,
            sensor: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Opening the serial port is the only fatal step: without the sensor
    /// there is nothing to serve.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let sensor = EnvSensor::open(&config.sensor).context("Cannot open the sensor")?;
        self.launch_with_sensor(sensor, config)
    }

    /// Launch the tasks around an already constructed sensor
    pub fn launch_with_sensor(&mut self, mut sensor: EnvSensor, config: &Config) -> Result<()> {
        info!("Starting sensor acquisition on {}", config.sensor.port);
        sensor.start()?;
        let store = sensor.store();
        self.sensor = Some(sensor);

        if config.telemetry.enabled {
            self.start_telemetry_relay(config, store.clone())?;
        }

        self.start_heartbeat(store)?;

        Ok(())
    }

    /// Start the Ambient relay task
    fn start_telemetry_relay(&mut self, config: &Config, store: ReadingStore) -> Result<()> {
        let client = AmbientClient::from_config(&config.telemetry)?;
        let interval = Duration::from_secs(config.telemetry.interval_secs);
        let shutdown = self.shutdown.subscribe();

        let task = tokio::spawn(telemetry::run_relay(client, store, interval, shutdown));
        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the latest reading periodically
    fn start_heartbeat(&mut self, store: ReadingStore) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(HEARTBEAT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately, before any reading exists
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                match store.snapshot() {
                    Some(latest) => info!(
                        "eCO2: {} ppm, temperature: {:.2} degC (at {})",
                        latest.reading.co2_ppm,
                        latest.reading.temperature_celsius(),
                        latest.timestamp.to_rfc3339()
                    ),
                    None => info!("eCO2: no reading yet"),
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Latest readings, `None` before [`Daemon::launch`]
    pub fn store(&self) -> Option<ReadingStore> {
        self.sensor.as_ref().map(EnvSensor::store)
    }

    /// Number of background tasks spawned by [`Daemon::launch`]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.shutdown.send_replace(true);
        if let Some(sensor) = &self.sensor {
            sensor.request_stop();
        }
    }

    /// Wait for all tasks to complete and the serial link to be closed
    pub async fn join(mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }

        if let Some(mut sensor) = self.sensor.take() {
            tokio::task::spawn_blocking(move || sensor.stop())
                .await
                .context("Sensor shutdown task panicked")??;
        }
        Ok(())
    }
}
