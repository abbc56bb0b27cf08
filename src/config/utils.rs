// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Config, CONFIG_SCHEMA, LOG_LEVELS};
use crate::registers::{BankKind, MAX_BANK_SIZE};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./frc_modbus_server --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Bind address**: must be an IP address or `localhost`
/// - **Bank sizes**: every bank holds between 1 and 65536 cells
/// - **Sessions**: at least one concurrent connection is allowed
/// - **Simulator**: the publishing interval is at least 1 ms and the noise is not negative
/// - **Logging**: the level is one of `off`, `error`, `warn`, `info`, `debug`, `trace`
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !is_valid_ip_address(&config.modbus.address) {
        anyhow::bail!("Invalid Modbus bind address: {}", config.modbus.address);
    }

    if config.modbus.max_connections == 0 {
        anyhow::bail!("modbus.max_connections must be at least 1");
    }

    let sizes = config.registers.bank_sizes();
    for kind in BankKind::ALL {
        let size = sizes.for_kind(kind);
        if size == 0 || size > MAX_BANK_SIZE {
            anyhow::bail!(
                "Invalid {} bank size {} (expected 1..={})",
                kind,
                size,
                MAX_BANK_SIZE
            );
        }
    }

    if config.simulator.interval_ms == 0 {
        anyhow::bail!("simulator.interval_ms must be at least 1");
    }
    if !config.simulator.gyro_noise.is_finite() || config.simulator.gyro_noise < 0.0 {
        anyhow::bail!(
            "simulator.gyro_noise must be a non-negative number, got {}",
            config.simulator.gyro_noise
        );
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        anyhow::bail!("Unknown log level: {}", config.logging.level);
    }

    Ok(())
}
