// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Dual-input H-bridge (L298N-style) with a separate PWM enable line.
//!
//! | Command | IN1 | IN2 | EN |
//! | ------- | --- | --- | -- |
//! | Forward | low | high | magnitude |
//! | Reverse | high | low | magnitude |
//! | Stop | low | low | 0 |
//!
//! Stop coasts the motor; there is no active braking.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use crate::control::{ActuatorCommand, Direction};
use crate::motors::Actuator;

pub struct HBridge<PWM, IN1, IN2> {
    pwm: PWM,
    in1: IN1,
    in2: IN2,
    pwm_max: u16,
}

impl<PWM, IN1, IN2> HBridge<PWM, IN1, IN2>
where
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Wrap the bridge pins. `pwm_max` is the command magnitude that maps to 100% duty.
    ///
    /// The bridge starts out coasting.
    pub fn new(pwm: PWM, in1: IN1, in2: IN2, pwm_max: u16) -> Self {
        let mut bridge = Self {
            pwm,
            in1,
            in2,
            pwm_max: pwm_max.max(1),
        };
        bridge.coast();
        bridge
    }

    /// Both inputs low, enable at 0%.
    pub fn coast(&mut self) {
        self.pwm.set_duty_cycle_fully_off().ok();
        self.in1.set_low().ok();
        self.in2.set_low().ok();
    }

    pub fn free(self) -> (PWM, IN1, IN2) {
        (self.pwm, self.in1, self.in2)
    }

    fn set_magnitude(&mut self, magnitude: u16) {
        let magnitude = magnitude.min(self.pwm_max);
        self.pwm
            .set_duty_cycle_fraction(magnitude, self.pwm_max)
            .ok();
    }
}

impl<PWM, IN1, IN2> Actuator for HBridge<PWM, IN1, IN2>
where
    PWM: SetDutyCycle,
    IN1: OutputPin,
    IN2: OutputPin,
{
    fn apply(&mut self, cmd: ActuatorCommand) {
        match cmd.direction {
            Direction::Forward => {
                self.in1.set_low().ok();
                self.in2.set_high().ok();
                self.set_magnitude(cmd.magnitude);
            }
            Direction::Reverse => {
                self.in1.set_high().ok();
                self.in2.set_low().ok();
                self.set_magnitude(cmd.magnitude);
            }
            Direction::Stop => self.coast(),
        }
    }
}
