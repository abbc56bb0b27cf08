// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus Application Protocol (MBAP) framing
//!
//! Every Modbus TCP message is a 7-byte MBAP header followed by the PDU
//! (function code and payload):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 2 | Transaction identifier |
//! | 2 | 2 | Protocol identifier (always 0) |
//! | 4 | 2 | Length of the unit identifier plus PDU |
//! | 6 | 1 | Unit identifier |
//!
//! All multi-byte fields are big-endian.

use thiserror::Error;

/// Size of the MBAP header in bytes.
pub const MBAP_HEADER_LEN: usize = 7;

/// Largest PDU a Modbus TCP frame can carry.
pub const MAX_PDU_LEN: usize = 253;

/// Protocol identifier of Modbus in the MBAP header.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

/// Malformed or truncated frames
///
/// These errors cannot be answered with an exception response because the
/// frame boundaries are no longer trustworthy; the session is closed instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unsupported protocol identifier {0:#06x}, expected 0")]
    InvalidProtocolId(u16),

    #[error("MBAP length field {0} is outside 2..=254")]
    InvalidLength(u16),

    #[error("connection closed after {received} of {expected} frame bytes")]
    Truncated { expected: usize, received: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Unit identifier byte plus PDU length.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn decode(bytes: &[u8; MBAP_HEADER_LEN]) -> Result<Self, FrameError> {
        let header = Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        };

        if header.protocol_id != MODBUS_PROTOCOL_ID {
            return Err(FrameError::InvalidProtocolId(header.protocol_id));
        }
        // At least a function code must follow the unit identifier
        if header.length < 2 || usize::from(header.length) > MAX_PDU_LEN + 1 {
            return Err(FrameError::InvalidLength(header.length));
        }

        Ok(header)
    }

    pub fn encode(&self) -> [u8; MBAP_HEADER_LEN] {
        let [t0, t1] = self.transaction_id.to_be_bytes();
        let [p0, p1] = self.protocol_id.to_be_bytes();
        let [l0, l1] = self.length.to_be_bytes();
        [t0, t1, p0, p1, l0, l1, self.unit_id]
    }

    /// Number of PDU bytes following the header.
    pub fn pdu_len(&self) -> usize {
        usize::from(self.length).saturating_sub(1)
    }
}

/// Build a complete frame around `pdu`.
///
/// `pdu` must not exceed [`MAX_PDU_LEN`]; every response produced by the
/// server stays within that bound.
pub fn encode_frame(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    debug_assert!(pdu.len() <= MAX_PDU_LEN);
    let header = MbapHeader {
        transaction_id,
        protocol_id: MODBUS_PROTOCOL_ID,
        length: (pdu.len() + 1) as u16,
        unit_id,
    };

    let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + pdu.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(pdu);
    frame
}
