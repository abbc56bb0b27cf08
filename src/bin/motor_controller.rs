// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Demo motor controller
//!
//! Connects to the register server, commands speed 50, reads the motor
//! position back, commands speed -30 and disconnects.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::time;

use frc_modbus_server::client::MotorControllerClient;
use frc_modbus_server::config::LoggingConfig;
use frc_modbus_server::utility::{init_logging, verbosity};

/// Motor controller client exercising the FRC Modbus server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Modbus server address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[arg(long, default_value_t = 502)]
    port: u16,

    /// Pause between two commands, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pause_ms: u64,

    /// Request timeout, in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig::default(), verbosity(args.verbose, false))?;

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", args.address, args.port))?;
    let pause = Duration::from_millis(args.pause_ms);

    let mut client =
        MotorControllerClient::with_timeout(socket_addr, Duration::from_millis(args.timeout_ms));
    if !client.connect().await {
        anyhow::bail!("Could not connect to Modbus server at {}", socket_addr);
    }

    if !client.set_motor_speed(50).await {
        error!("Setting motor speed 50 failed");
    }
    time::sleep(pause).await;

    match client.get_motor_position().await {
        Some(position) => info!("Current position: {}", position),
        None => error!("Reading motor position failed"),
    }

    if !client.set_motor_speed(-30).await {
        error!("Setting motor speed -30 failed");
    }
    time::sleep(pause).await;

    client.close().await;
    Ok(())
}
