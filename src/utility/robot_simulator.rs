// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the frc-modbus-server project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Synthetic robot sensor data
//!
//! The simulator stands in for the arm encoder and the gyro when no robot
//! hardware is attached. The daemon publishes one sample per configured
//! interval:
//!
//! - holding register 1 and input register 0 receive the arm position
//! - input register 1 receives the gyro angle in hundredths of a degree

use std::time::Instant;

use chrono::{DateTime, Local};
use rand::Rng;
use serde::Serialize;

use crate::config::SimulatorConfig;
use crate::registers::{BankKind, RegisterError, RegisterMap, MOTOR_POSITION_REGISTER};

/// Input register receiving the simulated arm position.
pub const ARM_POSITION_INPUT_REGISTER: u16 = 0;
/// Input register receiving the gyro angle × 100.
pub const GYRO_ANGLE_INPUT_REGISTER: u16 = 1;

/// One simulated sample of every sensor.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedData {
    pub arm_position: i16,
    pub gyro_angle: f32,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug)]
pub struct RobotSimulator {
    config: SimulatorConfig,
    start: Instant,
    arm_position: i16,
    gyro_angle: f32,
}

impl RobotSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            start: Instant::now(),
            arm_position: 0,
            gyro_angle: 0.0,
        }
    }

    /// Arm position for the current elapsed time.
    pub fn simulate_arm_position(&mut self) -> i16 {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.arm_position = self.arm_position_at(elapsed);
        self.arm_position
    }

    /// Arm position `elapsed` seconds after start, truncated toward zero.
    pub fn arm_position_at(&self, elapsed: f64) -> i16 {
        // float to int casts saturate
        (self.config.amplitude * (elapsed * self.config.angular_frequency).sin()) as i16
    }

    /// Advance the gyro random walk by one step.
    pub fn simulate_gyro(&mut self) -> f32 {
        let noise = self.config.gyro_noise;
        if noise > 0.0 {
            self.gyro_angle += rand::rng().random_range(-noise..=noise);
        }
        self.gyro_angle
    }

    pub fn sample(&mut self) -> SimulatedData {
        SimulatedData {
            arm_position: self.simulate_arm_position(),
            gyro_angle: self.simulate_gyro(),
            timestamp: Local::now(),
        }
    }

    /// Take a sample and publish it into `map`.
    pub fn apply(&mut self, map: &RegisterMap) -> Result<SimulatedData, RegisterError> {
        let data = self.sample();
        map.write_i16(
            BankKind::HoldingRegister,
            MOTOR_POSITION_REGISTER,
            data.arm_position,
        )?;
        map.write(
            BankKind::InputRegister,
            ARM_POSITION_INPUT_REGISTER,
            &[
                data.arm_position as u16,
                gyro_to_register(data.gyro_angle) as u16,
            ],
        )?;
        Ok(data)
    }
}

/// Gyro angle in hundredths of a degree, saturated to the i16 range.
pub fn gyro_to_register(angle: f32) -> i16 {
    (angle * 100.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> RobotSimulator {
        RobotSimulator::new(SimulatorConfig::default())
    }

    #[test]
    fn arm_follows_sine() {
        let sim = simulator();
        assert_eq!(sim.arm_position_at(0.0), 0);
        // 1000 * sin(0.5) = 479.4
        assert_eq!(sim.arm_position_at(1.0), 479);
        assert_eq!(sim.arm_position_at(-1.0), -479);
        // peak at t = pi
        let peak = sim.arm_position_at(std::f64::consts::PI);
        assert!((999..=1000).contains(&peak));
    }

    #[test]
    fn gyro_steps_are_bounded() {
        let mut sim = simulator();
        let mut previous = 0.0f32;
        for _ in 0..200 {
            let angle = sim.simulate_gyro();
            assert!((angle - previous).abs() <= 0.5 + f32::EPSILON);
            previous = angle;
        }
    }

    #[test]
    fn gyro_without_noise_stays_put() {
        let mut sim = RobotSimulator::new(SimulatorConfig {
            gyro_noise: 0.0,
            ..Default::default()
        });
        assert_eq!(sim.simulate_gyro(), 0.0);
        assert_eq!(sim.simulate_gyro(), 0.0);
    }

    #[test]
    fn gyro_register_saturates() {
        assert_eq!(gyro_to_register(1.234), 123);
        assert_eq!(gyro_to_register(-0.5), -50);
        assert_eq!(gyro_to_register(1000.0), i16::MAX);
        assert_eq!(gyro_to_register(-1000.0), i16::MIN);
    }

    #[test]
    fn apply_publishes_sample() {
        let map = RegisterMap::default();
        let mut sim = simulator();
        let data = sim.apply(&map).unwrap();

        assert_eq!(
            map.read_i16(BankKind::HoldingRegister, MOTOR_POSITION_REGISTER)
                .unwrap(),
            data.arm_position
        );
        assert_eq!(
            map.read_i16(BankKind::InputRegister, ARM_POSITION_INPUT_REGISTER)
                .unwrap(),
            data.arm_position
        );
        assert_eq!(
            map.read_i16(BankKind::InputRegister, GYRO_ANGLE_INPUT_REGISTER)
                .unwrap(),
            gyro_to_register(data.gyro_angle)
        );
        // motor speed command is left to clients
        assert_eq!(map.read(BankKind::HoldingRegister, 0, 1).unwrap(), vec![0]);
    }

    #[test]
    fn apply_fails_on_undersized_map() {
        let map = RegisterMap::new(crate::registers::BankSizes::uniform(1));
        let mut sim = simulator();
        assert!(sim.apply(&map).is_err());
    }
}
