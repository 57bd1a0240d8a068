// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control Algorithms
//!
//! Building blocks for closed-loop position control and open-loop identification of a brushed DC
//! motor.
//!
//! ## Modules
//!
//! - [`angle`] - Wrapped shaft angle and wraparound-corrected velocity from encoder counts.
//! - [`pid`] - Angular PID controller with anti-windup and a filtered derivative.
//! - [`drive`] - Deadzone and saturation mapping from controller output to PWM.
//! - [`identification`] - Duty sweep state machine that measures the motor time constant.

pub mod angle;
pub mod drive;
pub mod identification;
pub mod pid;

pub use angle::{wrap_360, wrap_shortest, AngleEstimator};
pub use drive::{ActuatorCommand, Direction, DriveMapper};
pub use identification::IdentificationStateMachine;
pub use pid::{Gains, Pid};
