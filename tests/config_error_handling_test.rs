// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use frc_modbus_server::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

fn assert_rejected_with_sample(config_path: &Path) {
    let result = Config::from_file(config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        sample_path.exists(),
        "Sample config file was not created at {:?}",
        sample_path
    );
    let sample = Config::from_file(&sample_path).expect("sample config must be valid");
    assert_eq!(sample, Config::default());
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let invalid_yaml = r#"
modbus:
  port: "not-an-integer"
  max_connections: 0
"#;
    fs::write(&config_path, invalid_yaml)?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "visualization:\n  port: 8080\n")?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}

#[test]
fn test_bank_size_out_of_range_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "registers:\n  holding_registers: 70000\n")?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}

#[test]
fn test_invalid_address_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "modbus:\n  address: \"robot.local\"\n")?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}

#[test]
fn test_invalid_log_level_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "logging:\n  level: chatty\n")?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}

#[test]
fn test_malformed_yaml_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "modbus: [unclosed\n")?;

    assert_rejected_with_sample(&config_path);
    Ok(())
}
