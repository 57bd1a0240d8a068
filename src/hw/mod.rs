// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! STM32F7 peripheral wrappers. Only built for the target.

pub mod clock;
pub mod encoder;
pub mod gpio;
pub mod pins;
pub mod pwm;
pub mod usart;

pub use clock::Millis;
pub use encoder::Encoder;
pub use gpio::{DigitalIn, DigitalOut};
pub use pins::BoardPins;
pub use pwm::Pwm;
pub use usart::{Usart, UsartRx};
