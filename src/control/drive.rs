// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Mapping of a signed control signal onto an H-bridge drive command.

#[allow(unused_imports)]
use micromath::F32Ext;

/// Logical drive direction for the motor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Increases the measured angle.
    Forward,
    Reverse,
    Stop,
}

/// Direction plus PWM magnitude in `0..=pwm_max`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorCommand {
    pub direction: Direction,
    pub magnitude: u16,
}

impl ActuatorCommand {
    pub const STOP: Self = Self {
        direction: Direction::Stop,
        magnitude: 0,
    };

    pub const fn new(direction: Direction, magnitude: u16) -> Self {
        match direction {
            Direction::Stop => Self::STOP,
            _ if magnitude == 0 => Self::STOP,
            _ => Self {
                direction,
                magnitude,
            },
        }
    }

    /// Signed PWM value: positive forward, negative reverse.
    #[inline]
    pub fn signed(&self) -> i32 {
        match self.direction {
            Direction::Forward => self.magnitude as i32,
            Direction::Reverse => -(self.magnitude as i32),
            Direction::Stop => 0,
        }
    }
}

/// Deadzone-aware saturating mapper from controller output to PWM.
#[derive(Copy, Clone, Debug)]
pub struct DriveMapper {
    pwm_max: u16,
    deadzone: f32,
}

impl DriveMapper {
    pub const fn new(pwm_max: u16, deadzone: f32) -> Self {
        Self { pwm_max, deadzone }
    }

    #[inline]
    pub fn pwm_max(&self) -> u16 {
        self.pwm_max
    }

    /// Map a controller output to a drive command.
    ///
    /// `|output| <= deadzone` stops the motor. Anything larger is clamped to `pwm_max` and truncated
    /// to an integer duty. A non-finite output stops the motor.
    pub fn map(&self, output: f32) -> ActuatorCommand {
        if output.is_nan() || output.abs() <= self.deadzone {
            return ActuatorCommand::STOP;
        }

        let limit = self.pwm_max as f32;
        let clamped = output.clamp(-limit, limit);
        let direction = if clamped > 0.0 {
            Direction::Forward
        } else {
            Direction::Reverse
        };

        ActuatorCommand::new(direction, clamped.abs() as u16)
    }
}
