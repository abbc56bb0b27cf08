// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use frc_modbus_server::config::{Config, ModbusConfig};
use frc_modbus_server::modbus::ServerOptions;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config::default();
    config.modbus = ModbusConfig {
        address: "0.0.0.0".to_string(),
        port: 5020,
        idle_timeout_secs: 10,
        max_connections: 4,
    };
    config.registers.holding_registers = 250;
    config.simulator.enabled = true;
    config.logging.file = Some("server.log".to_string());

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.modbus.port, 502);
    assert_eq!(default_config.modbus.address, "127.0.0.1");
    assert_eq!(default_config.registers.bank_sizes().coils, 100);
    assert_eq!(default_config.registers.metadata_file, "registers.json");
    assert!(!default_config.simulator.enabled);
    assert_eq!(default_config.logging.level, "info");

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let config = Config::from_yaml("modbus:\n  port: 1502\nregisters:\n  coils: 16\n")?;
    assert_eq!(config.modbus.port, 1502);
    assert_eq!(config.modbus.address, "127.0.0.1");
    assert_eq!(config.modbus.max_connections, 32);
    assert_eq!(config.registers.coils, 16);
    assert_eq!(config.registers.discrete_inputs, 100);

    let empty = Config::from_yaml("")?;
    assert_eq!(empty, Config::default());
    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();
    config.apply_args(None, None, None, false);
    assert_eq!(config, Config::default());

    config.apply_args(
        Some("10.12.34.2".to_string()),
        Some(5020),
        Some("robot.json".to_string()),
        true,
    );
    assert_eq!(config.modbus.address, "10.12.34.2");
    assert_eq!(config.modbus.port, 5020);
    assert_eq!(config.registers.metadata_file, "robot.json");
    assert!(config.simulator.enabled);
}

#[test]
fn test_server_options_from_config() {
    let mut modbus = ModbusConfig::default();
    let options = ServerOptions::from(&modbus);
    assert_eq!(options.idle_timeout, Some(Duration::from_secs(300)));
    assert_eq!(options.max_connections, 32);

    modbus.idle_timeout_secs = 0;
    assert_eq!(ServerOptions::from(&modbus).idle_timeout, None);
}

#[test]
fn test_bind_address() {
    let mut modbus = ModbusConfig::default();
    assert_eq!(modbus.bind_address(), "127.0.0.1:502");
    modbus.address = "::1".to_string();
    assert_eq!(modbus.bind_address(), "[::1]:502");
}

#[test]
fn test_file_round_trip_is_valid_yaml() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("written.yaml");
    Config::default().save_to_file(&config_path)?;

    let contents = fs::read_to_string(&config_path)?;
    assert!(contents.contains("modbus:"));
    assert!(contents.contains("holding_registers: 100"));
    assert_eq!(Config::from_yaml(&contents)?, Config::default());
    Ok(())
}
