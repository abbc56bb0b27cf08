// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP server through which robot
//! subsystems exchange control and sensor values.
//!
//! ## Key Components
//!
//! - [`frame`]: MBAP header decoding and response framing
//! - [`pdu`]: request decoding, response encoding and exception codes
//! - [`RequestHandler`]: applies decoded requests to the [`RegisterMap`]
//! - [`Session`]: per-connection request loop
//! - [`ModbusTcpServer`]: the TCP listener spawning sessions
//!
//! ## Error handling
//!
//! Invalid requests (unknown function, bad address range, bad value) are
//! answered with exception responses and the session continues. Frames
//! that cannot be delimited (wrong protocol identifier, impossible length,
//! truncated data) close the session. Neither ever affects other sessions
//! or the register map.
//!
//! [`RegisterMap`]: crate::registers::RegisterMap

pub mod frame;
pub mod handler;
pub mod modbus_server;
pub mod pdu;
pub mod session;

pub use frame::{FrameError, MbapHeader};
pub use handler::RequestHandler;
pub use modbus_server::{ModbusTcpServer, ServerOptions};
pub use pdu::{ExceptionCode, Request, Response};
pub use session::{Session, SessionError, SessionState};
