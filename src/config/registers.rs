// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register map configuration

use serde::{Deserialize, Serialize};

use crate::registers::{BankSizes, DEFAULT_BANK_SIZE};

/// Sizes of the four register banks and location of the metadata table.
///
/// Bank sizes are fixed for the lifetime of the server. Each must lie in
/// `1..=65536`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistersConfig {
    pub discrete_inputs: usize,
    pub coils: usize,
    pub holding_registers: usize,
    pub input_registers: usize,

    /// JSON file naming registers in Modbus reference notation.
    ///
    /// A missing file falls back to the built-in motor controller table.
    pub metadata_file: String,
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            discrete_inputs: DEFAULT_BANK_SIZE,
            coils: DEFAULT_BANK_SIZE,
            holding_registers: DEFAULT_BANK_SIZE,
            input_registers: DEFAULT_BANK_SIZE,
            metadata_file: "registers.json".to_string(),
        }
    }
}

impl RegistersConfig {
    pub fn bank_sizes(&self) -> BankSizes {
        BankSizes {
            discrete_inputs: self.discrete_inputs,
            coils: self.coils,
            holding_registers: self.holding_registers,
            input_registers: self.input_registers,
        }
    }
}
