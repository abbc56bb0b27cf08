// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! FRC Modbus server library
//!
//! This library provides a Modbus TCP register server used as the central
//! data-exchange point between robot subsystems. Clients write control values
//! (motor speed commands, enable flags) and read sensed values (positions,
//! gyro angles) through four fixed-size register banks.
//!
//! ## Modules
//!
//! - [`registers`]: register banks, the shared register map and the optional
//!   symbolic metadata table
//! - [`modbus`]: MBAP framing, PDU codec, request handler and TCP listener
//! - [`client`]: the motor controller client used by demos and tests
//! - [`config`]: YAML configuration validated against an embedded JSON schema
//! - [`daemon`]: task orchestration for the server binary
//! - [`utility`]: logging setup and the robot data simulator

pub mod client;
pub mod config;
pub mod daemon;
pub mod modbus;
pub mod registers;
pub mod utility;

pub use registers::{BankKind, RegisterMap};
