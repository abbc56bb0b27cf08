// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod logging;
pub mod robot_simulator;

// Re-exports for use in other modules
pub use logging::{init_logging, verbosity};
pub use robot_simulator::{RobotSimulator, SimulatedData};
