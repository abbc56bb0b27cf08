// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Motor controller client
//!
//! A thin wrapper around the `tokio-modbus` TCP client that plays the role
//! of a motor controller: it writes the speed command into holding
//! register 0 and reads the motor position back from holding register 1.
//!
//! Every operation reports failure as `false` or `None` after logging the
//! cause, so callers in demo loops never have to unwind. A transport error
//! or a timed out request drops the connection, since a late response would
//! otherwise be matched with the next request; call
//! [`MotorControllerClient::connect`] again to recover.

use std::net::SocketAddr;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use crate::registers::{MOTOR_POSITION_REGISTER, MOTOR_SPEED_REGISTER};

/// Default time allowed for connecting and for each request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Valid motor speed commands, in percent of full power.
pub const MOTOR_SPEED_RANGE: std::ops::RangeInclusive<i16> = -100..=100;

type ModbusResult<T> = Result<Result<T, tokio_modbus::ExceptionCode>, tokio_modbus::Error>;

pub struct MotorControllerClient {
    addr: SocketAddr,
    timeout: Duration,
    ctx: Option<Context>,
}

impl MotorControllerClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_timeout(addr, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(addr: SocketAddr, timeout: Duration) -> Self {
        Self {
            addr,
            timeout,
            ctx: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    /// Connect to the server, replacing any previous connection.
    pub async fn connect(&mut self) -> bool {
        self.ctx = None;
        match time::timeout(self.timeout, tcp::connect(self.addr)).await {
            Ok(Ok(ctx)) => {
                info!("Connected to Modbus server at {}", self.addr);
                self.ctx = Some(ctx);
                true
            }
            Ok(Err(err)) => {
                error!("Connection error: {}", err);
                false
            }
            Err(_) => {
                error!(
                    "Failed to connect to Modbus server at {} within {:?}",
                    self.addr, self.timeout
                );
                false
            }
        }
    }

    /// Write one holding register, sending `value` in two's complement.
    pub async fn write_single_register(&mut self, address: u16, value: i16) -> bool {
        let timeout = self.timeout;
        let Some(ctx) = self.ctx.as_mut() else {
            error!("Not connected to server");
            return false;
        };
        let result = time::timeout(timeout, ctx.write_single_register(address, value as u16)).await;
        self.settle("writing holding register", result).is_some()
    }

    /// Read `count` holding registers as signed values.
    pub async fn read_holding_registers(&mut self, address: u16, count: u16) -> Option<Vec<i16>> {
        let timeout = self.timeout;
        let Some(ctx) = self.ctx.as_mut() else {
            error!("Not connected to server");
            return None;
        };
        let result = time::timeout(timeout, ctx.read_holding_registers(address, count)).await;
        self.settle("reading holding registers", result)
            .map(|words| words.into_iter().map(|word| word as i16).collect())
    }

    /// Set the motor speed command (-100 to 100).
    pub async fn set_motor_speed(&mut self, speed: i16) -> bool {
        if !MOTOR_SPEED_RANGE.contains(&speed) {
            error!("Motor speed {} outside {:?}", speed, MOTOR_SPEED_RANGE);
            return false;
        }
        self.write_single_register(MOTOR_SPEED_REGISTER, speed).await
    }

    pub async fn get_motor_position(&mut self) -> Option<i16> {
        self.read_holding_registers(MOTOR_POSITION_REGISTER, 1)
            .await
            .and_then(|values| values.first().copied())
    }

    pub async fn close(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            match time::timeout(self.timeout, ctx.disconnect()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("Error while disconnecting: {}", err),
                Err(_) => warn!("Disconnect from {} timed out", self.addr),
            }
            info!("Disconnected from server");
        }
    }

    /// Turn a timed request outcome into an option, logging the failure and
    /// dropping the connection when the transport can no longer be trusted.
    fn settle<T>(
        &mut self,
        what: &str,
        result: Result<ModbusResult<T>, time::error::Elapsed>,
    ) -> Option<T> {
        match result {
            Ok(Ok(Ok(value))) => Some(value),
            Ok(Ok(Err(exception))) => {
                error!("Error {}: server answered {:?}", what, exception);
                None
            }
            Ok(Err(err)) => {
                error!("Error {}: {}", what, err);
                self.ctx = None;
                None
            }
            Err(_) => {
                error!("Error {}: no response within {:?}", what, self.timeout);
                self.ctx = None;
                None
            }
        }
    }
}
