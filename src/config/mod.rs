// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the FRC Modbus server
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the server. The configuration is backed by a
//! YAML file and validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `modbus`: network binding and session limits of the Modbus TCP server
//! - `registers`: register bank sizes and the metadata table location
//! - `simulator`: the optional robot data simulator
//! - `logging`: log level and destination
//!
//! ## Usage
//!
//! ```no_run
//! use frc_modbus_server::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("0.0.0.0".to_string()), // Modbus address
//!     Some(5020),                  // Modbus port
//!     None,                        // Metadata file
//!     true,                        // Enable the simulator
//! );
//!
//! println!("Modbus port: {}", config.modbus.port);
//! ```

pub mod logging;
pub mod modbus;
pub mod registers;
pub mod simulator;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use logging::{LoggingConfig, LOG_LEVELS};
pub use modbus::ModbusConfig;
pub use registers::RegistersConfig;
pub use simulator::SimulatorConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// JSON schema every configuration file is validated against.
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure for the server.
///
/// Every section falls back to its defaults when omitted, so an empty
/// document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Modbus TCP listener settings.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Register bank sizes and metadata file.
    #[serde(default)]
    pub registers: RegistersConfig,

    /// Robot data simulator settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Config path: {:?}, sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// fails schema validation, deserialization or the additional rules of
    /// [`utils::validate_specific_rules`] is rejected and a
    /// `<name>.sample.yaml` file with defaults is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml(&contents).inspect_err(|_| {
            if let Err(err) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", err);
            }
        })
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // An empty document means "all defaults"
        let json_value = match serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?
        {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value => value,
        };

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = serde_json::from_value(json_value).map_err(|err| {
            error!("Configuration deserialization error: {}", err);
            anyhow::anyhow!("Failed to deserialize configuration: {}", err)
        })?;

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// # Parameters
    ///
    /// * `modbus_address` - Network address for the Modbus server
    /// * `modbus_port` - TCP port for the Modbus server
    /// * `metadata_file` - Register metadata JSON file
    /// * `simulate` - If true, enables the robot data simulator
    pub fn apply_args(
        &mut self,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        metadata_file: Option<String>,
        simulate: bool,
    ) {
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(file) = metadata_file {
            debug!("Overriding metadata file from command line: {}", file);
            self.registers.metadata_file = file;
        }
        if simulate {
            debug!("Enabling simulator from command line");
            self.simulator.enabled = true;
        }
    }
}
