// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Motor Abstractions
//!
//! The control loop sees a motor only through two capabilities: something that reports a signed
//! rotation count ([`RotationSensor`]) and something that accepts a drive command ([`Actuator`]).
//!
//! ## Modules
//!
//! - [`dc_motor`] - Brushed DC motor assembled from an encoder driver and an H-bridge driver.
//! - [`sim_motor`] - First-order plant model used on the host and in tests.

use crate::control::ActuatorCommand;

pub mod dc_motor;
pub mod sim_motor;

pub use dc_motor::DcMotor;
pub use sim_motor::SimMotor;

/// Source of a signed, monotonic-per-direction rotation count.
pub trait RotationSensor {
    /// Signed count since the last [`zero`](Self::zero).
    fn count(&self) -> i32;

    /// Make the current position count zero.
    fn zero(&mut self);

    /// Called every scheduler iteration. Polled sensors sample their input here.
    #[inline]
    fn poll(&mut self) {}
}

/// Drive stage accepting direction + magnitude commands.
pub trait Actuator {
    fn apply(&mut self, cmd: ActuatorCommand);
}
