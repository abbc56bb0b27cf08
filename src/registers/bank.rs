// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-size register banks

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use serde::{Deserialize, Serialize};

use super::RegisterError;

/// Number of cells in each bank when nothing else is configured.
pub const DEFAULT_BANK_SIZE: usize = 100;

/// Largest bank that can be addressed with a 16-bit Modbus address.
pub const MAX_BANK_SIZE: usize = 1 << 16;

/// The four standard Modbus data tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankKind {
    DiscreteInput,
    Coil,
    HoldingRegister,
    InputRegister,
}

impl BankKind {
    pub const ALL: [BankKind; 4] = [
        BankKind::DiscreteInput,
        BankKind::Coil,
        BankKind::HoldingRegister,
        BankKind::InputRegister,
    ];

    /// Whether cells of this bank hold a single bit (0 or 1).
    pub const fn is_bit(self) -> bool {
        matches!(self, BankKind::DiscreteInput | BankKind::Coil)
    }

    /// Whether Modbus clients may only read this bank.
    ///
    /// Read-only banks are still writable through [`RegisterBank::write`] so
    /// that local producers such as the simulator can publish values.
    pub const fn is_read_only(self) -> bool {
        matches!(self, BankKind::DiscreteInput | BankKind::InputRegister)
    }

    /// Leading digit of the classic Modbus reference notation (`40001`, ...).
    pub const fn reference_prefix(self) -> u8 {
        match self {
            BankKind::Coil => 0,
            BankKind::DiscreteInput => 1,
            BankKind::InputRegister => 3,
            BankKind::HoldingRegister => 4,
        }
    }

    pub const fn from_reference_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            0 => Some(BankKind::Coil),
            1 => Some(BankKind::DiscreteInput),
            3 => Some(BankKind::InputRegister),
            4 => Some(BankKind::HoldingRegister),
            _ => None,
        }
    }
}

impl fmt::Display for BankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BankKind::DiscreteInput => "discrete input",
            BankKind::Coil => "coil",
            BankKind::HoldingRegister => "holding register",
            BankKind::InputRegister => "input register",
        };
        f.write_str(name)
    }
}

/// A zero-indexed, fixed-size array of 16-bit cells.
///
/// The bank size never changes after construction. All accesses are bounds
/// checked against it and fail with [`RegisterError::OutOfRange`] instead of
/// panicking.
///
/// ### Thread Safety
///
/// The cells live behind a `RwLock`. A read copies the requested range while
/// holding the shared guard, and a write validates its whole input before
/// taking the exclusive guard and copying it in one step. Readers therefore
/// never observe a partially applied multi-cell write, and concurrent writes
/// to the same range leave exactly one of them in place.
#[derive(Debug)]
pub struct RegisterBank {
    kind: BankKind,
    size: usize,
    cells: RwLock<Vec<u16>>,
}

impl RegisterBank {
    /// Create a zero-filled bank of `size` cells.
    pub fn new(kind: BankKind, size: usize) -> Self {
        Self {
            kind,
            size,
            cells: RwLock::new(vec![0; size]),
        }
    }

    pub fn kind(&self) -> BankKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Read `count` consecutive cells starting at `address`.
    pub fn read(&self, address: u16, count: u16) -> Result<Vec<u16>, RegisterError> {
        let range = self.checked_range(address, usize::from(count))?;
        let cells = self.read_guard();
        Ok(cells[range].to_vec())
    }

    /// Write a contiguous block of cells starting at `address`.
    ///
    /// On bit banks every value must be 0 or 1. The write is all-or-nothing:
    /// if any value or the range is rejected the bank is left untouched.
    pub fn write(&self, address: u16, values: &[u16]) -> Result<(), RegisterError> {
        let range = self.checked_range(address, values.len())?;

        if self.kind.is_bit() {
            if let Some((offset, &value)) = values.iter().enumerate().find(|(_, v)| **v > 1) {
                return Err(RegisterError::InvalidValue {
                    kind: self.kind,
                    // The range check guarantees address + offset fits in u16.
                    address: address.wrapping_add(offset as u16),
                    value,
                });
            }
        }

        let mut cells = self.write_guard();
        cells[range].copy_from_slice(values);
        drop(cells);

        debug!(
            "Wrote {} {} cell(s) starting at address {}",
            values.len(),
            self.kind,
            address
        );
        Ok(())
    }

    /// Read cells of a bit bank as booleans.
    pub fn read_bits(&self, address: u16, count: u16) -> Result<Vec<bool>, RegisterError> {
        Ok(self
            .read(address, count)?
            .into_iter()
            .map(|value| value != 0)
            .collect())
    }

    /// Write booleans into consecutive cells (`true` is stored as 1).
    pub fn write_bits(&self, address: u16, values: &[bool]) -> Result<(), RegisterError> {
        let raw: Vec<u16> = values.iter().map(|&bit| u16::from(bit)).collect();
        self.write(address, &raw)
    }

    /// Copy of the whole bank.
    pub fn snapshot(&self) -> Vec<u16> {
        self.read_guard().clone()
    }

    fn checked_range(
        &self,
        address: u16,
        count: usize,
    ) -> Result<std::ops::Range<usize>, RegisterError> {
        let start = usize::from(address);
        let end = start + count;
        if end > self.size {
            return Err(RegisterError::OutOfRange {
                kind: self.kind,
                address,
                count,
                size: self.size,
            });
        }
        Ok(start..end)
    }

    // A poisoned lock cannot hold a torn write: writes only mutate after
    // validation, through a single copy_from_slice.
    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<u16>> {
        self.cells.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<u16>> {
        self.cells.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_bank_is_zero_filled() {
        let bank = RegisterBank::new(BankKind::HoldingRegister, 100);
        assert_eq!(bank.size(), 100);
        assert!(bank.snapshot().iter().all(|&v| v == 0));
    }

    #[test]
    fn write_then_read_returns_written_values() {
        let bank = RegisterBank::new(BankKind::HoldingRegister, 100);
        bank.write(10, &[1, 2, 3, 0xFFFF]).unwrap();
        assert_eq!(bank.read(10, 4).unwrap(), vec![1, 2, 3, 0xFFFF]);
        assert_eq!(bank.read(9, 1).unwrap(), vec![0]);
    }

    #[test]
    fn last_cell_is_addressable() {
        let bank = RegisterBank::new(BankKind::InputRegister, 100);
        bank.write(99, &[42]).unwrap();
        assert_eq!(bank.read(99, 1).unwrap(), vec![42]);
    }

    #[test]
    fn out_of_range_read_is_rejected() {
        let bank = RegisterBank::new(BankKind::HoldingRegister, 100);
        let err = bank.read(95, 10).unwrap_err();
        assert_eq!(
            err,
            RegisterError::OutOfRange {
                kind: BankKind::HoldingRegister,
                address: 95,
                count: 10,
                size: 100,
            }
        );
        assert!(bank.read(100, 1).is_err());
        assert!(bank.read(u16::MAX, u16::MAX).is_err());
    }

    #[test]
    fn out_of_range_write_leaves_bank_unchanged() {
        let bank = RegisterBank::new(BankKind::HoldingRegister, 100);
        bank.write(95, &[7; 5]).unwrap();
        let before = bank.snapshot();

        assert!(matches!(
            bank.write(96, &[1; 5]),
            Err(RegisterError::OutOfRange { .. })
        ));
        assert_eq!(bank.snapshot(), before);
    }

    #[test]
    fn bit_bank_rejects_non_binary_values() {
        let bank = RegisterBank::new(BankKind::Coil, 16);
        bank.write(3, &[1]).unwrap();

        let err = bank.write(2, &[0, 2, 1]).unwrap_err();
        assert_eq!(
            err,
            RegisterError::InvalidValue {
                kind: BankKind::Coil,
                address: 3,
                value: 2,
            }
        );
        // Nothing from the rejected block was applied
        assert_eq!(bank.read(2, 3).unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn word_bank_accepts_any_value() {
        let bank = RegisterBank::new(BankKind::HoldingRegister, 4);
        bank.write(0, &[2, 0x8000, 0xFF00, 0xFFFF]).unwrap();
        assert_eq!(bank.read(0, 4).unwrap(), vec![2, 0x8000, 0xFF00, 0xFFFF]);
    }

    #[test]
    fn bit_helpers_convert_booleans() {
        let bank = RegisterBank::new(BankKind::DiscreteInput, 8);
        bank.write_bits(1, &[true, false, true]).unwrap();
        assert_eq!(bank.read(0, 4).unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(
            bank.read_bits(0, 4).unwrap(),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn concurrent_writers_never_tear_a_block() {
        let bank = Arc::new(RegisterBank::new(BankKind::HoldingRegister, 100));
        let a = vec![0xAAAA; 50];
        let b = vec![0x5555; 50];

        let handles: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|block| {
                let bank = Arc::clone(&bank);
                thread::spawn(move || {
                    for _ in 0..500 {
                        bank.write(0, &block).unwrap();
                        let seen = bank.read(0, 50).unwrap();
                        assert!(seen.iter().all(|&v| v == seen[0]), "torn read: {seen:?}");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let final_block = bank.read(0, 50).unwrap();
        assert!(final_block == a || final_block == b);
    }

    #[test]
    fn reference_prefixes_round_trip() {
        for kind in BankKind::ALL {
            assert_eq!(
                BankKind::from_reference_prefix(kind.reference_prefix()),
                Some(kind)
            );
        }
        assert_eq!(BankKind::from_reference_prefix(2), None);
    }
}
