// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the FRC Modbus register server
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;

use frc_modbus_server::config::{self, Config, LoggingConfig};
use frc_modbus_server::daemon::Daemon;
use frc_modbus_server::utility::{init_logging, verbosity};

/// Modbus TCP register server for FRC robot subsystems
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Modbus server address
    #[arg(long)]
    address: Option<String>,

    /// Modbus server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Register metadata file (JSON, Modbus reference notation)
    #[arg(long)]
    metadata: Option<String>,

    /// Publish simulated arm and gyro values into the registers
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level_override = verbosity(args.verbose, args.quiet);

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = args.validate_config {
        init_logging(&LoggingConfig::default(), level_override)?;
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(args.address, args.port, args.metadata, args.simulate);
    config::utils::validate_specific_rules(&config)?;

    init_logging(&config.logging, level_override)?;
    info!(
        "FRC Modbus server {} using {}",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, terminating daemon"),
        Err(err) => error!("Error waiting for shutdown signal: {}", err),
    }
    daemon.shutdown();
    daemon.join().await?;

    Ok(())
}
