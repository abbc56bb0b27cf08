// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request handler mapping Modbus function codes onto the register map

use std::sync::Arc;

use log::{debug, error};

use super::frame::{encode_frame, MbapHeader};
use super::pdu::{ExceptionCode, ExceptionResponse, Request, Response};
use crate::registers::{BankKind, RegisterAddress, RegisterMap};

/// Stateless request processor shared by every session.
///
/// The handler decodes a request PDU, applies it to the shared
/// [`RegisterMap`] and encodes either the response or an exception
/// response. Every failure below this point is converted into a
/// well-formed exception reply, so handling a PDU never fails.
///
/// Coils and holding registers are writable by clients. Discrete inputs and
/// input registers are only readable through the protocol; no function code
/// writes them.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    map: Arc<RegisterMap>,
}

impl RequestHandler {
    pub fn new(map: Arc<RegisterMap>) -> Self {
        Self { map }
    }

    pub fn register_map(&self) -> &Arc<RegisterMap> {
        &self.map
    }

    /// Process a complete request and return the complete response frame,
    /// echoing the transaction and unit identifiers of `header`.
    pub fn handle_frame(&self, header: &MbapHeader, pdu: &[u8]) -> Vec<u8> {
        let response = self.handle_pdu(pdu);
        encode_frame(header.transaction_id, header.unit_id, &response)
    }

    /// Process one request PDU and return the response PDU.
    pub fn handle_pdu(&self, pdu: &[u8]) -> Vec<u8> {
        let function_code = pdu.first().copied().unwrap_or_default();

        match Request::decode(pdu).and_then(|request| self.dispatch(request)) {
            Ok(response) => response.encode(),
            Err(exception) => {
                error!(
                    "Exception::{:?} - function code {:#04x}",
                    exception, function_code
                );
                ExceptionResponse::new(function_code, exception).encode()
            }
        }
    }

    /// Apply a decoded request to the register map.
    pub fn dispatch(&self, request: Request) -> Result<Response, ExceptionCode> {
        debug!("Received Modbus request: {:?}", request);
        request.check_quantity()?;

        let res = match request {
            Request::ReadCoils(addr, cnt) => self
                .map
                .read_bits(BankKind::Coil, addr, cnt)
                .map(Response::ReadCoils),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .map
                .read_bits(BankKind::DiscreteInput, addr, cnt)
                .map(Response::ReadDiscreteInputs),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .map
                .read(BankKind::HoldingRegister, addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::ReadInputRegisters(addr, cnt) => self
                .map
                .read(BankKind::InputRegister, addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::WriteSingleCoil(addr, value) => self
                .map
                .write_bits(BankKind::Coil, addr, &[value])
                .map(|_| {
                    self.trace_write(BankKind::Coil, addr, &[u16::from(value)]);
                    Response::WriteSingleCoil(addr, value)
                }),
            Request::WriteSingleRegister(addr, value) => self
                .map
                .write(BankKind::HoldingRegister, addr, &[value])
                .map(|_| {
                    self.trace_write(BankKind::HoldingRegister, addr, &[value]);
                    Response::WriteSingleRegister(addr, value)
                }),
            Request::WriteMultipleCoils(addr, values) => self
                .map
                .write_bits(BankKind::Coil, addr, &values)
                .map(|_| {
                    let raw: Vec<u16> = values.iter().map(|&bit| u16::from(bit)).collect();
                    self.trace_write(BankKind::Coil, addr, &raw);
                    Response::WriteMultipleCoils(addr, values.len() as u16)
                }),
            Request::WriteMultipleRegisters(addr, values) => self
                .map
                .write(BankKind::HoldingRegister, addr, &values)
                .map(|_| {
                    self.trace_write(BankKind::HoldingRegister, addr, &values);
                    Response::WriteMultipleRegisters(addr, values.len() as u16)
                }),
        };

        res.map_err(|err| {
            debug!("Modbus request error: {}", err);
            ExceptionCode::from(err)
        })
    }

    /// Log writes to registers documented in the metadata table.
    fn trace_write(&self, kind: BankKind, address: u16, values: &[u16]) {
        let metadata = self.map.metadata();
        if metadata.is_empty() || !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for (offset, &raw) in values.iter().enumerate() {
            let cell = address.wrapping_add(offset as u16);
            if let Some(info) = metadata.lookup(kind, cell) {
                debug!(
                    "{} ({}) set to {}",
                    info.name,
                    RegisterAddress::new(kind, cell),
                    info.register_type.format(raw)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{BankSizes, MetadataTable};

    fn handler() -> RequestHandler {
        RequestHandler::new(Arc::new(RegisterMap::with_metadata(
            BankSizes::default(),
            MetadataTable::builtin(),
        )))
    }

    #[test]
    fn write_then_read_holding_register() {
        let handler = handler();
        assert_eq!(
            handler.handle_pdu(&[0x06, 0x00, 0x00, 0x00, 0x32]),
            vec![0x06, 0x00, 0x00, 0x00, 0x32]
        );
        assert_eq!(
            handler.handle_pdu(&[0x03, 0x00, 0x00, 0x00, 0x01]),
            vec![0x03, 0x02, 0x00, 0x32]
        );
    }

    #[test]
    fn negative_speed_round_trips_as_twos_complement() {
        let handler = handler();
        let raw = (-30i16 as u16).to_be_bytes();
        handler.handle_pdu(&[0x06, 0x00, 0x00, raw[0], raw[1]]);
        assert_eq!(
            handler
                .register_map()
                .read_i16(BankKind::HoldingRegister, 0)
                .unwrap(),
            -30
        );
    }

    #[test]
    fn read_past_end_is_illegal_data_address() {
        let handler = handler();
        assert_eq!(
            handler.handle_pdu(&[0x03, 0x00, 95, 0x00, 10]),
            vec![0x83, 0x02]
        );
        assert_eq!(
            handler.dispatch(Request::ReadInputRegisters(100, 1)),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn dispatch_rejects_oversized_requests() {
        let handler = handler();
        assert_eq!(
            handler.dispatch(Request::ReadHoldingRegisters(0, 200)),
            Err(ExceptionCode::IllegalDataValue)
        );
        assert_eq!(
            handler.dispatch(Request::WriteMultipleRegisters(0, Vec::new())),
            Err(ExceptionCode::IllegalDataValue)
        );
    }

    #[test]
    fn unsupported_function_is_illegal_function() {
        let handler = handler();
        assert_eq!(handler.handle_pdu(&[0x07]), vec![0x87, 0x01]);
        assert_eq!(handler.handle_pdu(&[0x17, 0x00]), vec![0x97, 0x01]);
    }

    #[test]
    fn invalid_coil_value_keeps_previous_state() {
        let handler = handler();
        assert_eq!(
            handler.handle_pdu(&[0x05, 0x00, 0x02, 0xFF, 0x00]),
            vec![0x05, 0x00, 0x02, 0xFF, 0x00]
        );
        assert_eq!(
            handler.handle_pdu(&[0x05, 0x00, 0x02, 0x00, 0x01]),
            vec![0x85, 0x03]
        );
        assert_eq!(
            handler.register_map().read(BankKind::Coil, 2, 1).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn write_multiple_registers_past_end_changes_nothing() {
        let handler = handler();
        let pdu = [0x10, 0x00, 99, 0x00, 0x02, 0x04, 0x00, 0x01, 0x00, 0x02];
        assert_eq!(handler.handle_pdu(&pdu), vec![0x90, 0x02]);
        assert_eq!(
            handler
                .register_map()
                .read(BankKind::HoldingRegister, 99, 1)
                .unwrap(),
            vec![0]
        );
    }

    #[test]
    fn coils_read_back_packed() {
        let handler = handler();
        let pdu = [0x0F, 0x00, 0x00, 0x00, 0x0A, 0x02, 0xCD, 0x01];
        assert_eq!(
            handler.handle_pdu(&pdu),
            vec![0x0F, 0x00, 0x00, 0x00, 0x0A]
        );
        assert_eq!(
            handler.handle_pdu(&[0x01, 0x00, 0x00, 0x00, 0x0A]),
            vec![0x01, 0x02, 0xCD, 0x01]
        );
    }

    #[test]
    fn read_only_banks_are_served() {
        let handler = handler();
        let map = handler.register_map();
        map.write(BankKind::InputRegister, 0, &[1234]).unwrap();
        map.write_bits(BankKind::DiscreteInput, 0, &[false, true]).unwrap();

        assert_eq!(
            handler.handle_pdu(&[0x04, 0x00, 0x00, 0x00, 0x01]),
            vec![0x04, 0x02, 0x04, 0xD2]
        );
        assert_eq!(
            handler.handle_pdu(&[0x02, 0x00, 0x00, 0x00, 0x02]),
            vec![0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn frame_echoes_transaction_and_unit() {
        let handler = handler();
        let header = MbapHeader {
            transaction_id: 0xBEEF,
            protocol_id: 0,
            length: 6,
            unit_id: 0x11,
        };
        let frame = handler.handle_frame(&header, &[0x03, 0x00, 0x00, 0x00, 0x02]);
        assert_eq!(
            frame,
            vec![0xBE, 0xEF, 0x00, 0x00, 0x00, 0x07, 0x11, 0x03, 0x04, 0, 0, 0, 0]
        );
    }
}
