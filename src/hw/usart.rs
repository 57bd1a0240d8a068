// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART abstraction layer.
//!
//! The transmit half is a blocking text sink implementing `core::fmt::Write`, so it can back a
//! [`Telemetry`](crate::telemetry::Telemetry). The receive half is a non-blocking
//! [`ByteSource`] for the command parser.
//!
//! Note: When using `writeln!`, be sure to include `\r` (CR) in the format string to ensure correct
//! line endings on the terminal.
//!
//! To access the terminal on the host machine, connect to the debug USB port and use
//! ```text
//! $ screen /dev/tty.usbmodem* <baud_rate>
//! ```
//!
//! To close the debug terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use core::fmt;
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{self, Instance, Pins, Rx, Serial, Tx},
};

use crate::protocol::ByteSource;

pub struct Usart<U: Instance> {
    tx: Tx<U>,
}

/// Receive half of a [`Usart`].
pub struct UsartRx<U: Instance> {
    rx: Rx<U>,
}

impl<U: Instance> Usart<U> {
    /// Split `serial` into a transmit sink and a receive source.
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> (Self, UsartRx<U>) {
        let (tx, rx) = serial.split();
        (Self { tx }, UsartRx { rx })
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_byte(b);
        }
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Usart`.
impl<U: Instance> fmt::Write for Usart<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Usart::write_str(self, s);
        Ok(())
    }
}

impl<U: Instance> ByteSource for UsartRx<U> {
    type Error = serial::Error;

    #[inline]
    fn read_byte(&mut self) -> nb::Result<u8, serial::Error> {
        self.rx.read()
    }
}
