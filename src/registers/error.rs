// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use thiserror::Error;

use super::BankKind;

/// Errors raised by register bank operations
///
/// Both variants are protocol-level failures: the request handler turns
/// them into Modbus exception responses and the session keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("{kind} access of {count} cell(s) at address {address} exceeds bank size {size}")]
    OutOfRange {
        kind: BankKind,
        address: u16,
        count: usize,
        size: usize,
    },

    #[error("value {value:#06x} is not valid for {kind} {address}")]
    InvalidValue {
        kind: BankKind,
        address: u16,
        value: u16,
    },
}
