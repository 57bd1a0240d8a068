// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Simulated DC motor.
//!
//! First-order speed response to the signed PWM command,
//!
//! ```text
//! dω/dt = (K·u − ω) / τ,    θ̇ = ω
//! ```
//!
//! integrated with forward Euler. The shaft angle is quantised into encoder counts so the control
//! loop sees the same resolution as on hardware.

#[allow(unused_imports)]
use micromath::F32Ext;

use super::{Actuator, RotationSensor};
use crate::control::ActuatorCommand;

/// Placeholder plant parameters used when no measurement is available.
pub const DEFAULT_TAU_S: f32 = 0.4;
pub const DEFAULT_GAIN: f32 = 12.4;

pub struct SimMotor {
    /// Time constant (s)
    tau_s: f32,
    /// DC gain ((deg/s)/PWM)
    gain: f32,
    counts_per_rev: f32,

    /// Signed PWM currently applied
    drive: f32,
    /// Shaft speed (deg/s)
    velocity: f32,
    /// Unwrapped shaft angle relative to the last zero (deg)
    angle_deg: f32,
}

impl SimMotor {
    pub fn new(tau_s: f32, gain: f32, counts_per_rev: f32) -> Self {
        Self {
            tau_s,
            gain,
            counts_per_rev,
            drive: 0.0,
            velocity: 0.0,
            angle_deg: 0.0,
        }
    }

    /// Integrate the plant forward by `dt_s` seconds.
    pub fn advance(&mut self, dt_s: f32) {
        if !(dt_s > 0.0) {
            return;
        }
        let accel = (self.gain * self.drive - self.velocity) / self.tau_s;
        self.velocity += accel * dt_s;
        self.angle_deg += self.velocity * dt_s;
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    pub fn angle_deg(&self) -> f32 {
        self.angle_deg
    }

    #[inline]
    pub fn drive(&self) -> f32 {
        self.drive
    }
}

impl RotationSensor for SimMotor {
    fn count(&self) -> i32 {
        (self.angle_deg / 360.0 * self.counts_per_rev).round() as i32
    }

    fn zero(&mut self) {
        self.angle_deg = 0.0;
    }
}

impl Actuator for SimMotor {
    fn apply(&mut self, cmd: ActuatorCommand) {
        self.drive = cmd.signed() as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Direction;
    use approx::assert_relative_eq;

    #[test]
    fn step_reaches_63_percent_after_tau() {
        let mut motor = SimMotor::new(0.5, 10.0, 374.0);
        motor.apply(ActuatorCommand::new(Direction::Forward, 100));
        for _ in 0..500 {
            motor.advance(0.001);
        }
        // final value K·u = 1000 deg/s
        assert_relative_eq!(motor.velocity(), 632.0, epsilon = 5.0);
    }

    #[test]
    fn reverse_turns_negative_and_zero_resets_count() {
        let mut motor = SimMotor::new(0.1, 10.0, 360.0);
        motor.apply(ActuatorCommand::new(Direction::Reverse, 200));
        for _ in 0..1000 {
            motor.advance(0.001);
        }
        assert!(motor.velocity() < 0.0);
        assert!(motor.count() < 0);
        motor.zero();
        assert_eq!(motor.count(), 0);
    }

    #[test]
    fn stop_decays() {
        let mut motor = SimMotor::new(0.1, 10.0, 360.0);
        motor.apply(ActuatorCommand::new(Direction::Forward, 100));
        for _ in 0..1000 {
            motor.advance(0.001);
        }
        motor.apply(ActuatorCommand::STOP);
        for _ in 0..2000 {
            motor.advance(0.001);
        }
        assert!(motor.velocity().abs() < 1.0);
        assert_eq!(motor.drive(), 0.0);
    }
}
