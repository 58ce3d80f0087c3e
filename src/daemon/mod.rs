//! # Daemon Module
//!
//! The daemon module runs the sensor poll loop together with the background
//! services consuming its readings: the Ambient telemetry relay and a
//! heartbeat logging the latest values.
//!
//! ## Usage
//!
//! ```no_run
//! use envsensor::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
