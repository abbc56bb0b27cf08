// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration for the simulated robot data source
//!
//! When enabled, the daemon periodically publishes a synthetic arm position
//! and gyro angle into the register map so that clients can be exercised
//! without robot hardware.

use serde::{Deserialize, Serialize};

/// Parameters of the robot data simulator.
///
/// The arm position follows `amplitude * sin(t * angular_frequency)` where
/// `t` is the elapsed time in seconds. The gyro angle drifts as a random
/// walk with steps drawn uniformly from `[-gyro_noise, gyro_noise]`.
///
/// ```
/// use frc_modbus_server::config::SimulatorConfig;
///
/// let config = SimulatorConfig {
///     enabled: true,
///     interval_ms: 20,
///     ..Default::default()
/// };
/// assert_eq!(config.amplitude, 1000.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Publish simulated values into the register map.
    pub enabled: bool,

    /// Period between two published samples, in milliseconds.
    pub interval_ms: u64,

    /// Peak arm position in encoder units.
    pub amplitude: f64,

    /// Angular frequency of the arm oscillation in rad/s.
    pub angular_frequency: f64,

    /// Largest gyro drift per sample, in degrees.
    pub gyro_noise: f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 100,
            amplitude: 1000.0,
            angular_frequency: 0.5,
            gyro_noise: 0.5,
        }
    }
}
