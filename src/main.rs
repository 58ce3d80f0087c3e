// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the envsensor acquisition daemon
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use envsensor::config::{self, Config};
use envsensor::daemon::Daemon;
use envsensor::ChecksumPolicy;

/// CO2 and temperature acquisition from an OMRON 2JCIE-BU sensor
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML), created with defaults if missing
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Serial port of the sensor
    #[arg(long)]
    port: Option<String>,

    /// Pause between poll cycles in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Response checksum handling: accept, warn or reject
    #[arg(long)]
    checksum_policy: Option<ChecksumPolicy>,

    /// Forward readings to Ambient
    #[arg(long)]
    telemetry: bool,

    /// Ambient channel id (also read from AMBIENT_CHANNEL_ID)
    #[arg(long)]
    channel_id: Option<String>,

    /// Ambient write key (also read from AMBIENT_WRITE_KEY)
    #[arg(long)]
    write_key: Option<String>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    let mut config = Config::from_file(&args.config)?;
    config.apply_env();
    config.apply_args(
        args.port,
        args.interval_ms,
        args.checksum_policy,
        args.telemetry,
        args.channel_id,
        args.write_key,
    );
    config.validate()?;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    info!("envsensor running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    daemon.shutdown();
    daemon.join().await?;
    info!("envsensor stopped");

    Ok(())
}
