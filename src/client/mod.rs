// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus clients talking to the register server

pub mod motor_controller;

pub use motor_controller::{MotorControllerClient, DEFAULT_REQUEST_TIMEOUT, MOTOR_SPEED_RANGE};
