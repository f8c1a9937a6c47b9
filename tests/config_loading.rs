//! Configuration loading tests
//!
//! Files are written to temporary directories; tests touching the process
//! environment run serially.

use serial_test::serial;
use slot_daq::config::AppConfig;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/slot_daq.toml");
    let config = AppConfig::load_from(path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.device.max, 8);
    assert_eq!(config.driver.r#type, "mock_filter_wheel");
    assert_eq!(config.driver.config["slot_count"].as_integer(), Some(8));
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.device.name, "Filter Wheel");
    assert_eq!((config.device.min, config.device.max), (1, 12));
    assert!(config.device.enable_labels);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
        [device]
        name = "Turret"
        max = 4
        labels = ["10x", "20x", "40x", "100x"]
        "#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert_eq!(config.device.name, "Turret");
    assert_eq!(config.device.max, 4);
    assert_eq!(config.device.min, 1);
    assert_eq!(config.device.group, "Main Control");
    assert_eq!(config.application.log_format, "pretty");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_invalid_values_fail_validation() {
    let file = write_config(
        r#"
        [device]
        min = 5
        max = 2
        "#,
    );
    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    let file = write_config("[device\nname = ");
    assert!(AppConfig::load_from(file.path()).is_err());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
        [application]
        log_level = "info"

        [device]
        max = 6
        "#,
    );

    std::env::set_var("SLOT_DAQ_APPLICATION__LOG_LEVEL", "debug");
    std::env::set_var("SLOT_DAQ_DEVICE__MAX", "9");
    std::env::set_var("SLOT_DAQ_DRIVER__CONFIG__MODE", "realistic");
    let loaded = AppConfig::load_from(file.path());
    std::env::remove_var("SLOT_DAQ_APPLICATION__LOG_LEVEL");
    std::env::remove_var("SLOT_DAQ_DEVICE__MAX");
    std::env::remove_var("SLOT_DAQ_DRIVER__CONFIG__MODE");

    let config = loaded.unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.device.max, 9);
    assert_eq!(config.driver.config["mode"].as_str(), Some("realistic"));
}
