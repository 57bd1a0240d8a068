// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the raw `hw/` layer and below the
//! application logic. They are written against `embedded-hal` traits only, so they build and test
//! on the host.
//!
//! ## Existing drivers
//!
//! - [`h_bridge`] – IN1/IN2 + PWM enable H-bridge (L298N-style)
//! - [`slit_encoder`] – slotted-disc photo-interrupter counted by polling

pub mod h_bridge;
pub mod slit_encoder;

pub use h_bridge::HBridge;
pub use slit_encoder::SlitEncoder;
