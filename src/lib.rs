// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Motorlab Firmware
//!
//! Position control and open-loop system identification for a brushed DC motor with a rotary
//! encoder, written in Rust, targeting an STM32F767 MCU driving an L298N-style H-bridge.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | MCU-level wrappers around USART, timers, SysTick (target only) |
//! | [`drivers`] | Device-level drivers (H-bridge, slit encoder) |
//! | [`motors`] | Sensor/actuator capability traits, motor composition, plant model |
//! | [`control`] | Angle estimation, PID, drive mapping, identification state machine |
//! | [`protocol`] | Serial line commands (`R:`, `G:`, `S`, `Z`) |
//! | [`telemetry`] | Serial output lines (`TASK:`, `Data:`, `Tau:`, `ZEROED`) |
//! | [`scheduler`] | Cooperative loop tying everything together |
//! | [`config`] | Tunable constants and per-task presets |
//!
//! Everything except [`hw`] is hardware-independent and is unit-tested on the host.
//!
//! ## Getting Started
//!
//! Run the tests and the host simulation:
//!
//! ```bash
//! cargo test
//! cargo run
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod control;
pub mod drivers;
#[cfg(target_os = "none")]
pub mod hw;
pub mod motors;
pub mod protocol;
pub mod scheduler;
pub mod telemetry;
