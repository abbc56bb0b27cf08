// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Symbolic register metadata
//!
//! The metadata file is a JSON object keyed by Modbus reference addresses,
//! each entry giving a register name and value type:
//!
//! ```json
//! {
//!     "40001": { "name": "arm_motor_speed", "type": "int16" },
//!     "40002": { "name": "arm_motor_position", "type": "int16" },
//!     "00001": { "name": "arm_enabled", "type": "bool" }
//! }
//! ```
//!
//! The leading digit selects the bank (`0` coil, `1` discrete input,
//! `3` input register, `4` holding register) and the remaining digits are
//! a 1-based offset, so `40001` is holding register 0. Both the five-digit
//! and six-digit forms are accepted.
//!
//! The table is loaded once at startup and is only used to name registers
//! in logs and tools.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BankKind, BankSizes};

/// Errors raised while loading a metadata file
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read register metadata from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid register metadata JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid Modbus reference address '{0}'")]
    InvalidAddress(String),
}

/// Value type documented for a register.
///
/// Type names other than `int16`, `uint16` and `bool` are accepted as
/// [`RegisterType::Other`] and displayed as raw unsigned values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterType {
    Int16,
    Uint16,
    Bool,
    #[serde(other)]
    Other,
}

impl RegisterType {
    /// Render a raw cell value according to this type.
    pub fn format(self, raw: u16) -> String {
        match self {
            RegisterType::Int16 => (raw as i16).to_string(),
            RegisterType::Uint16 | RegisterType::Other => raw.to_string(),
            RegisterType::Bool => (raw != 0).to_string(),
        }
    }
}

/// Name and type of one documented register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub register_type: RegisterType,
}

/// A bank-qualified, zero-based register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterAddress {
    pub kind: BankKind,
    pub address: u16,
}

impl RegisterAddress {
    pub const fn new(kind: BankKind, address: u16) -> Self {
        Self { kind, address }
    }
}

impl FromStr for RegisterAddress {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetadataError::InvalidAddress(s.to_string());

        if !(5..=6).contains(&s.len()) || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let kind = BankKind::from_reference_prefix(s.as_bytes()[0] - b'0').ok_or_else(invalid)?;
        let offset: u32 = s[1..].parse().map_err(|_| invalid())?;
        if offset == 0 {
            return Err(invalid());
        }
        let address = u16::try_from(offset - 1).map_err(|_| invalid())?;

        Ok(Self { kind, address })
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:04}",
            self.kind.reference_prefix(),
            u32::from(self.address) + 1
        )
    }
}

/// Immutable address → name/type table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    entries: BTreeMap<RegisterAddress, RegisterInfo>,
}

impl MetadataTable {
    /// The mappings used when no metadata file is available.
    pub fn builtin() -> Self {
        let entries = [
            (BankKind::HoldingRegister, 0, "arm_motor_speed", RegisterType::Int16),
            (BankKind::HoldingRegister, 1, "arm_motor_position", RegisterType::Int16),
            (BankKind::HoldingRegister, 2, "arm_enabled", RegisterType::Bool),
        ]
        .into_iter()
        .map(|(kind, address, name, register_type)| {
            (
                RegisterAddress::new(kind, address),
                RegisterInfo {
                    name: name.to_string(),
                    register_type,
                },
            )
        })
        .collect();

        Self { entries }
    }

    /// Parse a metadata document.
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        let raw: BTreeMap<String, RegisterInfo> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(key, info)| key.parse::<RegisterAddress>().map(|addr| (addr, info)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { entries })
    }

    /// Load the metadata file at `path`.
    ///
    /// A missing file is not an error: the built-in table is returned and a
    /// warning is logged. Unreadable or malformed files are reported.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "{} not found, using default register mappings",
                path.display()
            );
            return Ok(Self::builtin());
        }

        let contents = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&contents)?;
        info!(
            "Successfully loaded {} register mappings from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn lookup(&self, kind: BankKind, address: u16) -> Option<&RegisterInfo> {
        self.entries.get(&RegisterAddress::new(kind, address))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegisterAddress, &RegisterInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries documenting cells that do not exist with the given sizes.
    pub fn out_of_bounds(&self, sizes: &BankSizes) -> Vec<RegisterAddress> {
        self.entries
            .keys()
            .filter(|addr| usize::from(addr.address) >= sizes.for_kind(addr.kind))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_addresses() {
        let addr: RegisterAddress = "40001".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(BankKind::HoldingRegister, 0));

        let addr: RegisterAddress = "30010".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(BankKind::InputRegister, 9));

        let addr: RegisterAddress = "00001".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(BankKind::Coil, 0));

        let addr: RegisterAddress = "10100".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(BankKind::DiscreteInput, 99));

        let addr: RegisterAddress = "465536".parse().unwrap();
        assert_eq!(addr, RegisterAddress::new(BankKind::HoldingRegister, 65535));
    }

    #[test]
    fn rejects_malformed_reference_addresses() {
        for bad in ["", "4001", "40000", "20001", "4000a", "465537", "4000001", "-4001"] {
            assert!(
                bad.parse::<RegisterAddress>().is_err(),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn display_matches_reference_notation() {
        assert_eq!(
            RegisterAddress::new(BankKind::HoldingRegister, 0).to_string(),
            "40001"
        );
        assert_eq!(RegisterAddress::new(BankKind::Coil, 41).to_string(), "00042");
        let wide = RegisterAddress::new(BankKind::InputRegister, 9999);
        assert_eq!(wide.to_string(), "310000");
        assert_eq!(wide.to_string().parse::<RegisterAddress>().unwrap(), wide);
    }

    #[test]
    fn builtin_table_documents_the_arm() {
        let table = MetadataTable::builtin();
        assert_eq!(table.len(), 3);
        let speed = table.lookup(BankKind::HoldingRegister, 0).unwrap();
        assert_eq!(speed.name, "arm_motor_speed");
        assert_eq!(speed.register_type, RegisterType::Int16);
        assert_eq!(
            table.lookup(BankKind::HoldingRegister, 2).unwrap().register_type,
            RegisterType::Bool
        );
        assert!(table.lookup(BankKind::InputRegister, 0).is_none());
    }

    #[test]
    fn from_json_reads_entries() {
        let table = MetadataTable::from_json(
            r#"{
                "40001": {"name": "shooter_speed", "type": "int16"},
                "30002": {"name": "gyro", "type": "uint16"}
            }"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup(BankKind::InputRegister, 1).unwrap().name,
            "gyro"
        );
    }

    #[test]
    fn from_json_rejects_bad_keys() {
        assert!(matches!(
            MetadataTable::from_json(r#"{"9": {"name": "x", "type": "int16"}}"#),
            Err(MetadataError::InvalidAddress(_))
        ));
        assert!(matches!(
            MetadataTable::from_json(r#"{"40001": {"type": "int16"}}"#),
            Err(MetadataError::Parse(_))
        ));
    }

    #[test]
    fn unknown_types_are_kept_as_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registers.json");
        fs::write(
            &path,
            r#"{"40010": {"name": "arm_angle", "type": "float32"}}"#,
        )
        .unwrap();

        let table = MetadataTable::load(&path).unwrap();
        let info = table.lookup(BankKind::HoldingRegister, 9).unwrap();
        assert_eq!(info.name, "arm_angle");
        assert_eq!(info.register_type, RegisterType::Other);
        assert_eq!(info.register_type.format(0xFFE2), "65506");
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let table = MetadataTable::load("/nonexistent/dir/registers.json").unwrap();
        assert_eq!(table, MetadataTable::builtin());
    }

    #[test]
    fn out_of_bounds_entries_are_reported() {
        let table = MetadataTable::from_json(
            r#"{
                "40001": {"name": "ok", "type": "int16"},
                "40101": {"name": "too_far", "type": "int16"}
            }"#,
        )
        .unwrap();
        let missing = table.out_of_bounds(&BankSizes::default());
        assert_eq!(
            missing,
            vec![RegisterAddress::new(BankKind::HoldingRegister, 100)]
        );
    }

    #[test]
    fn values_are_formatted_by_type() {
        assert_eq!(RegisterType::Int16.format(0xFFE2), "-30");
        assert_eq!(RegisterType::Uint16.format(0xFFE2), "65506");
        assert_eq!(RegisterType::Bool.format(1), "true");
        assert_eq!(RegisterType::Bool.format(0), "false");
    }
}
