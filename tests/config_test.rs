use anyhow::Result;
use envsensor::config::{Config, SensorConfig, TelemetryConfig};
use envsensor::ChecksumPolicy;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config {
        sensor: SensorConfig {
            port: "/dev/ttyACM1".to_string(),
            interval_ms: 2500,
            checksum_policy: ChecksumPolicy::Reject,
            ..SensorConfig::default()
        },
        telemetry: TelemetryConfig {
            enabled: true,
            channel_id: "4242".to_string(),
            write_key: "0123456789abcdef".to_string(),
            ..TelemetryConfig::default()
        },
    };

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;

    assert_eq!(loaded_config, config);
    assert_eq!(loaded_config.sensor.timing().poll_interval.as_millis(), 2500);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    assert!(non_existent_path.exists());
    assert_eq!(default_config.sensor.port, "/dev/ttyUSB0");
    assert_eq!(default_config.sensor.settle_delay_ms, 1000);

    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &config_path,
        r#"
sensor:
  port: "COM3"
  checksum_policy: reject
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.sensor.port, "COM3");
    assert_eq!(config.sensor.checksum_policy, ChecksumPolicy::Reject);
    assert_eq!(config.sensor.read_len, 30);
    assert_eq!(config.sensor.baud_rate, 115_200);
    assert!(!config.telemetry.enabled);
    assert_eq!(config.telemetry.interval_secs, 60);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();

    config.apply_args(
        Some("/dev/ttyUSB3".to_string()),
        Some(500),
        Some(ChecksumPolicy::Accept),
        true,
        Some("99".to_string()),
        Some("key".to_string()),
    );

    assert_eq!(config.sensor.port, "/dev/ttyUSB3");
    assert_eq!(config.sensor.interval_ms, 500);
    assert_eq!(config.sensor.checksum_policy, ChecksumPolicy::Accept);
    assert!(config.telemetry.enabled);
    assert_eq!(config.telemetry.channel_id, "99");
    assert!(config.validate().is_ok());

    // Absent arguments leave the configuration untouched
    let before = config.clone();
    config.apply_args(None, None, None, false, None, None);
    assert_eq!(config, before);
}

#[test]
fn test_config_validation() {
    assert!(Config::default().validate().is_ok());

    let mut empty_port = Config::default();
    empty_port.sensor.port = String::new();
    assert!(empty_port.validate().is_err());

    let mut bad_endpoint = Config::default();
    bad_endpoint.telemetry = TelemetryConfig {
        enabled: true,
        endpoint: "ftp://ambidata.io".to_string(),
        channel_id: "1".to_string(),
        write_key: "key".to_string(),
        interval_secs: 60,
    };
    assert!(bad_endpoint.validate().is_err());

    let mut zero_interval = Config::default();
    zero_interval.telemetry.interval_secs = 0;
    assert!(zero_interval.validate().is_err());
}
