// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The shared register map

use serde::{Deserialize, Serialize};

use super::{BankKind, MetadataTable, RegisterBank, RegisterError, DEFAULT_BANK_SIZE};

/// Number of cells allocated to each bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankSizes {
    pub discrete_inputs: usize,
    pub coils: usize,
    pub holding_registers: usize,
    pub input_registers: usize,
}

impl BankSizes {
    /// The same size for all four banks.
    pub const fn uniform(size: usize) -> Self {
        Self {
            discrete_inputs: size,
            coils: size,
            holding_registers: size,
            input_registers: size,
        }
    }

    pub fn for_kind(&self, kind: BankKind) -> usize {
        match kind {
            BankKind::DiscreteInput => self.discrete_inputs,
            BankKind::Coil => self.coils,
            BankKind::HoldingRegister => self.holding_registers,
            BankKind::InputRegister => self.input_registers,
        }
    }
}

impl Default for BankSizes {
    fn default() -> Self {
        Self::uniform(DEFAULT_BANK_SIZE)
    }
}

/// Aggregate of the four register banks plus the symbolic metadata table.
///
/// A single `RegisterMap` is created at server start, wrapped in an `Arc`
/// and shared by every session and by the simulator. There is no reset or
/// resize operation: the map lives for the whole process.
///
/// The metadata table only names registers for diagnostics; reads and writes
/// are dispatched purely on [`BankKind`] and address.
#[derive(Debug)]
pub struct RegisterMap {
    discrete_inputs: RegisterBank,
    coils: RegisterBank,
    holding_registers: RegisterBank,
    input_registers: RegisterBank,
    metadata: MetadataTable,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::new(BankSizes::default())
    }
}

impl RegisterMap {
    /// Create a zero-filled map without metadata.
    pub fn new(sizes: BankSizes) -> Self {
        Self::with_metadata(sizes, MetadataTable::default())
    }

    /// Create a zero-filled map documented by `metadata`.
    pub fn with_metadata(sizes: BankSizes, metadata: MetadataTable) -> Self {
        Self {
            discrete_inputs: RegisterBank::new(BankKind::DiscreteInput, sizes.discrete_inputs),
            coils: RegisterBank::new(BankKind::Coil, sizes.coils),
            holding_registers: RegisterBank::new(
                BankKind::HoldingRegister,
                sizes.holding_registers,
            ),
            input_registers: RegisterBank::new(BankKind::InputRegister, sizes.input_registers),
            metadata,
        }
    }

    pub fn bank(&self, kind: BankKind) -> &RegisterBank {
        match kind {
            BankKind::DiscreteInput => &self.discrete_inputs,
            BankKind::Coil => &self.coils,
            BankKind::HoldingRegister => &self.holding_registers,
            BankKind::InputRegister => &self.input_registers,
        }
    }

    pub fn sizes(&self) -> BankSizes {
        BankSizes {
            discrete_inputs: self.discrete_inputs.size(),
            coils: self.coils.size(),
            holding_registers: self.holding_registers.size(),
            input_registers: self.input_registers.size(),
        }
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Read `count` consecutive cells of `kind` starting at `address`.
    pub fn read(&self, kind: BankKind, address: u16, count: u16) -> Result<Vec<u16>, RegisterError> {
        self.bank(kind).read(address, count)
    }

    /// Write a contiguous block of cells of `kind` starting at `address`.
    pub fn write(&self, kind: BankKind, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        self.bank(kind).write(address, values)
    }

    pub fn read_bits(
        &self,
        kind: BankKind,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, RegisterError> {
        self.bank(kind).read_bits(address, count)
    }

    pub fn write_bits(
        &self,
        kind: BankKind,
        address: u16,
        values: &[bool],
    ) -> Result<(), RegisterError> {
        self.bank(kind).write_bits(address, values)
    }

    /// Read one cell interpreted as a two's-complement signed value.
    pub fn read_i16(&self, kind: BankKind, address: u16) -> Result<i16, RegisterError> {
        let values = self.read(kind, address, 1)?;
        Ok(values[0] as i16)
    }

    /// Store a signed value in one cell using two's-complement encoding.
    pub fn write_i16(&self, kind: BankKind, address: u16, value: i16) -> Result<(), RegisterError> {
        self.write(kind, address, &[value as u16])
    }
}
