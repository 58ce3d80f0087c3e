use anyhow::Result;
use clap::Parser;
use std::thread;
use std::time::Duration;

use envsensor::acquisition::{SerialTransport, Transport, DEFAULT_BAUD_RATE};
use envsensor::protocol::decoder::{verify_checksum, DEFAULT_RESPONSE_LEN};
use envsensor::protocol::{build_latest_short_command, ChecksumPolicy, ResponseDecoder};

/// Send a single "latest data short" request and dump the response
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Serial port of the sensor
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Delay between request and read in milliseconds
    #[arg(long, default_value = "1000")]
    settle_ms: u64,

    /// Number of bytes to read
    #[arg(long, default_value_t = DEFAULT_RESPONSE_LEN)]
    read_len: usize,
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let mut transport =
        SerialTransport::open(&args.port, DEFAULT_BAUD_RATE, Duration::from_secs(1))?;

    let frame = build_latest_short_command();
    println!("Request:  {}", hex(&frame));
    transport.write(&frame)?;

    thread::sleep(Duration::from_millis(args.settle_ms));
    let response = transport.read(args.read_len)?;
    transport.close()?;

    println!("Response: {} ({} bytes)", hex(&response), response.len());

    match verify_checksum(&response) {
        Ok(()) => println!("Checksum: OK"),
        Err(e) => println!("Checksum: {}", e),
    }

    match ResponseDecoder::new(ChecksumPolicy::Accept).decode(&response) {
        Ok(reading) => {
            println!("eCO2:        {} ppm", reading.co2_ppm);
            println!("Temperature: {:.2} degC", reading.temperature_celsius());
        }
        Err(e) => println!("Decode failed: {}", e),
    }

    Ok(())
}
