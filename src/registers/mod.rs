// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register storage
//!
//! This module holds the in-memory data exposed by the Modbus server. The
//! storage is a fixed-shape [`RegisterMap`] with exactly one [`RegisterBank`]
//! per [`BankKind`]:
//!
//! | Kind | Modbus reference | Client access | Cell content |
//! |------|------------------|---------------|--------------|
//! | Coil | 0xxxx | read/write | 0 or 1 |
//! | Discrete input | 1xxxx | read only | 0 or 1 |
//! | Input register | 3xxxx | read only | 16-bit word |
//! | Holding register | 4xxxx | read/write | 16-bit word |
//!
//! Every bank is zero-filled at construction and guarded by its own lock, so
//! operations on different banks never contend while multi-cell operations on
//! the same bank are applied as a whole.
//!
//! ## Conventional layout
//!
//! - Holding register 0: motor speed command (signed, -100..=100)
//! - Holding register 1: motor position (signed)
//! - Input register 0: simulated arm position
//! - Input register 1: simulated gyro angle (degrees × 100)
//!
//! The [`MetadataTable`] documents such conventions by name but is never
//! consulted when serving reads or writes.

pub mod bank;
pub mod error;
pub mod map;
pub mod metadata;

pub use bank::{BankKind, RegisterBank, DEFAULT_BANK_SIZE, MAX_BANK_SIZE};
pub use error::RegisterError;
pub use map::{BankSizes, RegisterMap};
pub use metadata::{MetadataError, MetadataTable, RegisterAddress, RegisterInfo, RegisterType};

/// Holding register carrying the motor speed command.
pub const MOTOR_SPEED_REGISTER: u16 = 0;

/// Holding register carrying the motor position.
pub const MOTOR_POSITION_REGISTER: u16 = 1;
