// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Protocol data units
//!
//! Decoding of request PDUs and encoding of response PDUs for the function
//! codes served by this implementation:
//!
//! | Code | Function | Bank |
//! |------|----------|------|
//! | 0x01 | Read Coils | coils |
//! | 0x02 | Read Discrete Inputs | discrete inputs |
//! | 0x03 | Read Holding Registers | holding registers |
//! | 0x04 | Read Input Registers | input registers |
//! | 0x05 | Write Single Coil | coils |
//! | 0x06 | Write Single Register | holding registers |
//! | 0x0F | Write Multiple Coils | coils |
//! | 0x10 | Write Multiple Registers | holding registers |
//!
//! Bit values travel packed eight per byte, least significant bit first.

use std::fmt;

use crate::registers::RegisterError;

pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_COILS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Wire value of a coil switched on.
pub const COIL_ON: u16 = 0xFF00;
/// Wire value of a coil switched off.
pub const COIL_OFF: u16 = 0x0000;

const EXCEPTION_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
}

impl FunctionCode {
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::WriteSingleCoil),
            0x06 => Some(Self::WriteSingleRegister),
            0x0F => Some(Self::WriteMultipleCoils),
            0x10 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
        }
    }
}

/// Modbus exception codes returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
}

impl ExceptionCode {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IllegalFunction => "Illegal function",
            Self::IllegalDataAddress => "Illegal data address",
            Self::IllegalDataValue => "Illegal data value",
            Self::ServerDeviceFailure => "Server device failure",
        };
        f.write_str(text)
    }
}

impl From<RegisterError> for ExceptionCode {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::OutOfRange { .. } => Self::IllegalDataAddress,
            RegisterError::InvalidValue { .. } => Self::IllegalDataValue,
        }
    }
}

/// A decoded request.
///
/// Addresses are zero-based; read variants carry `(address, quantity)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils(u16, u16),
    ReadDiscreteInputs(u16, u16),
    ReadHoldingRegisters(u16, u16),
    ReadInputRegisters(u16, u16),
    WriteSingleCoil(u16, bool),
    WriteSingleRegister(u16, u16),
    WriteMultipleCoils(u16, Vec<bool>),
    WriteMultipleRegisters(u16, Vec<u16>),
}

impl Request {
    /// Decode a request PDU (function code followed by payload).
    ///
    /// Unknown function codes yield `IllegalFunction`; payloads with a wrong
    /// length, quantity or byte count, and coil values other than
    /// `0xFF00`/`0x0000`, yield `IllegalDataValue`. Address ranges are
    /// checked later against the bank.
    pub fn decode(pdu: &[u8]) -> Result<Self, ExceptionCode> {
        let (&code, payload) = pdu.split_first().ok_or(ExceptionCode::IllegalFunction)?;
        let function = FunctionCode::from_u8(code).ok_or(ExceptionCode::IllegalFunction)?;

        match function {
            FunctionCode::ReadCoils => {
                decode_read(payload, MAX_READ_BITS).map(|(a, q)| Self::ReadCoils(a, q))
            }
            FunctionCode::ReadDiscreteInputs => {
                decode_read(payload, MAX_READ_BITS).map(|(a, q)| Self::ReadDiscreteInputs(a, q))
            }
            FunctionCode::ReadHoldingRegisters => decode_read(payload, MAX_READ_REGISTERS)
                .map(|(a, q)| Self::ReadHoldingRegisters(a, q)),
            FunctionCode::ReadInputRegisters => decode_read(payload, MAX_READ_REGISTERS)
                .map(|(a, q)| Self::ReadInputRegisters(a, q)),
            FunctionCode::WriteSingleCoil => {
                let (address, raw) = two_words(payload)?;
                let value = match raw {
                    COIL_ON => true,
                    COIL_OFF => false,
                    _ => return Err(ExceptionCode::IllegalDataValue),
                };
                Ok(Self::WriteSingleCoil(address, value))
            }
            FunctionCode::WriteSingleRegister => {
                let (address, value) = two_words(payload)?;
                Ok(Self::WriteSingleRegister(address, value))
            }
            FunctionCode::WriteMultipleCoils => {
                let (address, quantity, data) = decode_write_block(payload, MAX_WRITE_COILS, |q| {
                    bytes_for_bits(usize::from(q))
                })?;
                Ok(Self::WriteMultipleCoils(
                    address,
                    unpack_bits(data, usize::from(quantity)),
                ))
            }
            FunctionCode::WriteMultipleRegisters => {
                let (address, _, data) =
                    decode_write_block(payload, MAX_WRITE_REGISTERS, |q| usize::from(q) * 2)?;
                let values = data
                    .chunks_exact(2)
                    .map(|word| u16::from_be_bytes([word[0], word[1]]))
                    .collect();
                Ok(Self::WriteMultipleRegisters(address, values))
            }
        }
    }

    /// Check the quantity carried by the request against the limits of its
    /// function code, so the response byte count always fits in one byte.
    pub fn check_quantity(&self) -> Result<(), ExceptionCode> {
        let (quantity, max) = match self {
            Self::ReadCoils(_, q) | Self::ReadDiscreteInputs(_, q) => {
                (usize::from(*q), MAX_READ_BITS)
            }
            Self::ReadHoldingRegisters(_, q) | Self::ReadInputRegisters(_, q) => {
                (usize::from(*q), MAX_READ_REGISTERS)
            }
            Self::WriteSingleCoil(..) | Self::WriteSingleRegister(..) => return Ok(()),
            Self::WriteMultipleCoils(_, values) => (values.len(), MAX_WRITE_COILS),
            Self::WriteMultipleRegisters(_, values) => (values.len(), MAX_WRITE_REGISTERS),
        };
        if (1..=usize::from(max)).contains(&quantity) {
            Ok(())
        } else {
            Err(ExceptionCode::IllegalDataValue)
        }
    }

    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(..) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(..) => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(..) => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters(..) => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil(..) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(..) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils(..) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(..) => FunctionCode::WriteMultipleRegisters,
        }
    }
}

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadCoils(Vec<bool>),
    ReadDiscreteInputs(Vec<bool>),
    ReadHoldingRegisters(Vec<u16>),
    ReadInputRegisters(Vec<u16>),
    WriteSingleCoil(u16, bool),
    WriteSingleRegister(u16, u16),
    /// `(address, quantity)`
    WriteMultipleCoils(u16, u16),
    /// `(address, quantity)`
    WriteMultipleRegisters(u16, u16),
}

impl Response {
    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(_) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Self::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Self::WriteSingleCoil(..) => FunctionCode::WriteSingleCoil,
            Self::WriteSingleRegister(..) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleCoils(..) => FunctionCode::WriteMultipleCoils,
            Self::WriteMultipleRegisters(..) => FunctionCode::WriteMultipleRegisters,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut pdu = vec![self.function_code().as_u8()];
        match self {
            Self::ReadCoils(bits) | Self::ReadDiscreteInputs(bits) => {
                let packed = pack_bits(bits);
                pdu.push(packed.len() as u8);
                pdu.extend_from_slice(&packed);
            }
            Self::ReadHoldingRegisters(words) | Self::ReadInputRegisters(words) => {
                pdu.push((words.len() * 2) as u8);
                for word in words {
                    pdu.extend_from_slice(&word.to_be_bytes());
                }
            }
            Self::WriteSingleCoil(address, value) => {
                pdu.extend_from_slice(&address.to_be_bytes());
                let raw = if *value { COIL_ON } else { COIL_OFF };
                pdu.extend_from_slice(&raw.to_be_bytes());
            }
            Self::WriteSingleRegister(address, value)
            | Self::WriteMultipleCoils(address, value)
            | Self::WriteMultipleRegisters(address, value) => {
                pdu.extend_from_slice(&address.to_be_bytes());
                pdu.extend_from_slice(&value.to_be_bytes());
            }
        }
        pdu
    }
}

/// Failure reply: the request function code with its high bit set,
/// followed by one exception code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    /// Function code of the request, without the exception flag.
    pub function_code: u8,
    pub exception: ExceptionCode,
}

impl ExceptionResponse {
    pub fn new(function_code: u8, exception: ExceptionCode) -> Self {
        Self {
            function_code,
            exception,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        vec![
            self.function_code | EXCEPTION_FLAG,
            self.exception.as_u8(),
        ]
    }
}

/// Pack booleans eight per byte, least significant bit first.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut packed = vec![0u8; bytes_for_bits(bits.len())];
    for (i, _) in bits.iter().enumerate().filter(|(_, bit)| **bit) {
        packed[i / 8] |= 1 << (i % 8);
    }
    packed
}

/// Unpack `count` booleans from LSB-first packed bytes.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| bytes.get(i / 8).is_some_and(|byte| byte & (1 << (i % 8)) != 0))
        .collect()
}

fn bytes_for_bits(count: usize) -> usize {
    count.div_ceil(8)
}

fn two_words(payload: &[u8]) -> Result<(u16, u16), ExceptionCode> {
    match payload {
        [a0, a1, b0, b1] => Ok((
            u16::from_be_bytes([*a0, *a1]),
            u16::from_be_bytes([*b0, *b1]),
        )),
        _ => Err(ExceptionCode::IllegalDataValue),
    }
}

fn check_quantity(quantity: u16, max: u16) -> Result<(), ExceptionCode> {
    if quantity == 0 || quantity > max {
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

fn decode_read(payload: &[u8], max: u16) -> Result<(u16, u16), ExceptionCode> {
    let (address, quantity) = two_words(payload)?;
    check_quantity(quantity, max)?;
    Ok((address, quantity))
}

/// Split a write-multiple payload into address, quantity and data bytes,
/// checking the quantity and that the byte count matches it exactly.
fn decode_write_block(
    payload: &[u8],
    max: u16,
    expected_bytes: impl Fn(u16) -> usize,
) -> Result<(u16, u16, &[u8]), ExceptionCode> {
    if payload.len() < 5 {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let (address, quantity) = two_words(&payload[..4])?;
    check_quantity(quantity, max)?;

    let byte_count = usize::from(payload[4]);
    let data = &payload[5..];
    if byte_count != expected_bytes(quantity) || data.len() != byte_count {
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok((address, quantity, data))
}
