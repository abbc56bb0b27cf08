// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::time::{self, Duration};
use tokio_modbus::prelude::*;

use frc_modbus_server::registers::{BankKind, MetadataTable, RegisterAddress};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Bank {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl From<Bank> for BankKind {
    fn from(bank: Bank) -> Self {
        match bank {
            Bank::Coils => BankKind::Coil,
            Bank::DiscreteInputs => BankKind::DiscreteInput,
            Bank::HoldingRegisters => BankKind::HoldingRegister,
            Bank::InputRegisters => BankKind::InputRegister,
        }
    }
}

/// Read a range of registers from the FRC Modbus server and print them
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Modbus server address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[arg(long, default_value_t = 502)]
    port: u16,

    /// Register bank to read
    #[arg(long, value_enum, default_value_t = Bank::HoldingRegisters)]
    bank: Bank,

    /// Starting address (0-based)
    #[arg(long, default_value_t = 0)]
    start: u16,

    /// Number of cells to read
    #[arg(long, default_value_t = 3)]
    quantity: u16,

    /// Metadata file used to name registers
    #[arg(long, default_value = "registers.json")]
    metadata: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    let args = Args::parse();
    let metadata = MetadataTable::load(&args.metadata)?;

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", args.address, args.port))?;
    println!("Connecting to Modbus server at {}", socket_addr);

    let timeout = Duration::from_secs(1);
    let mut ctx = time::timeout(timeout, tcp::connect(socket_addr))
        .await
        .context("Connection timed out")??;

    let kind = BankKind::from(args.bank);
    let values: Vec<u16> = match kind {
        BankKind::Coil => time::timeout(timeout, ctx.read_coils(args.start, args.quantity))
            .await
            .context("Request timed out")???
            .into_iter()
            .map(u16::from)
            .collect(),
        BankKind::DiscreteInput => {
            time::timeout(timeout, ctx.read_discrete_inputs(args.start, args.quantity))
                .await
                .context("Request timed out")???
                .into_iter()
                .map(u16::from)
                .collect()
        }
        BankKind::HoldingRegister => {
            time::timeout(timeout, ctx.read_holding_registers(args.start, args.quantity))
                .await
                .context("Request timed out")???
        }
        BankKind::InputRegister => {
            time::timeout(timeout, ctx.read_input_registers(args.start, args.quantity))
                .await
                .context("Request timed out")???
        }
    };

    println!(
        "Read {} {} value(s) starting at address {}",
        values.len(),
        kind,
        args.start
    );
    for (offset, raw) in values.into_iter().enumerate() {
        let address = args.start.wrapping_add(offset as u16);
        let reference = RegisterAddress::new(kind, address);
        match metadata.lookup(kind, address) {
            Some(info) => println!(
                "{} [{}] {} = {}",
                address,
                reference,
                info.name,
                info.register_type.format(raw)
            ),
            None => println!("{} [{}] = {}", address, reference, raw),
        }
    }

    ctx.disconnect().await?;
    Ok(())
}
