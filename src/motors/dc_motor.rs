// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Brushed DC motor built from an encoder and an H-bridge.
//!
//! This module connects a position sensor (TIM2 quadrature encoder or the slit-disc counter) with
//! an H-bridge driver and exposes both through the [`RotationSensor`] and [`Actuator`] traits.

use super::{Actuator, RotationSensor};
use crate::control::ActuatorCommand;

/// High-level motor combining a sensor and a drive stage.
pub struct DcMotor<S, A> {
    sensor: S,
    driver: A,
    last: ActuatorCommand,
}

impl<S, A> DcMotor<S, A>
where
    S: RotationSensor,
    A: Actuator,
{
    /// Create a new motor. The drive stage is commanded to stop.
    pub fn new(sensor: S, mut driver: A) -> Self {
        driver.apply(ActuatorCommand::STOP);
        Self {
            sensor,
            driver,
            last: ActuatorCommand::STOP,
        }
    }

    /// Tear down this motor and return its constituent parts.
    pub fn free(self) -> (S, A) {
        (self.sensor, self.driver)
    }

    /// Most recent command sent to the driver.
    #[inline]
    pub fn last_command(&self) -> ActuatorCommand {
        self.last
    }

    #[inline]
    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}

impl<S: RotationSensor, A> RotationSensor for DcMotor<S, A> {
    #[inline]
    fn count(&self) -> i32 {
        self.sensor.count()
    }

    #[inline]
    fn zero(&mut self) {
        self.sensor.zero();
    }

    #[inline]
    fn poll(&mut self) {
        self.sensor.poll();
    }
}

impl<S, A: Actuator> Actuator for DcMotor<S, A> {
    fn apply(&mut self, cmd: ActuatorCommand) {
        self.last = cmd;
        self.driver.apply(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Direction;

    #[derive(Default)]
    struct Counter {
        count: i32,
        polls: u32,
    }

    impl RotationSensor for Counter {
        fn count(&self) -> i32 {
            self.count
        }
        fn zero(&mut self) {
            self.count = 0;
        }
        fn poll(&mut self) {
            self.polls += 1;
        }
    }

    #[derive(Default)]
    struct Recorder {
        applied: std::vec::Vec<ActuatorCommand>,
    }

    impl Actuator for Recorder {
        fn apply(&mut self, cmd: ActuatorCommand) {
            self.applied.push(cmd);
        }
    }

    #[test]
    fn stops_on_construction_and_delegates() {
        let mut motor = DcMotor::new(Counter::default(), Recorder::default());
        motor.apply(ActuatorCommand::new(Direction::Reverse, 80));
        motor.poll();
        assert_eq!(motor.last_command().signed(), -80);
        assert_eq!(motor.sensor().polls, 1);

        let (mut sensor, driver) = motor.free();
        assert_eq!(
            driver.applied,
            [ActuatorCommand::STOP, ActuatorCommand::new(Direction::Reverse, 80)]
        );
        sensor.count = 17;
        sensor.zero();
        assert_eq!(sensor.count(), 0);
    }
}
