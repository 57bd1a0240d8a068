// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! `embedded-hal` 1.0 digital pin wrappers around HAL GPIO pins.
//!
//! The drivers in [`crate::drivers`] are written against `embedded_hal::digital`. These wrappers
//! forward to the HAL's inherent pin methods, which cannot fail.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use stm32f7xx_hal::gpio::{self, Input, Output, PullUp, PushPull};

/// Push-pull output, generic over any GPIO pin.
pub struct DigitalOut<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
}

impl<const P: char, const N: u8> DigitalOut<P, N> {
    /// Configure `pin` as a push-pull output, initially low.
    pub fn new<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        let mut pin = pin.into_push_pull_output();
        pin.set_low();
        Self { pin }
    }

    pub fn free(self) -> gpio::Pin<P, N, Output<PushPull>> {
        self.pin
    }
}

impl<const P: char, const N: u8> ErrorType for DigitalOut<P, N> {
    type Error = Infallible;
}

impl<const P: char, const N: u8> OutputPin for DigitalOut<P, N> {
    #[inline]
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.pin.set_low();
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.pin.set_high();
        Ok(())
    }
}

/// Input with the internal pull-up enabled.
pub struct DigitalIn<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Input<PullUp>>,
}

impl<const P: char, const N: u8> DigitalIn<P, N> {
    pub fn pull_up<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        Self {
            pin: pin.into_pull_up_input(),
        }
    }
}

impl<const P: char, const N: u8> ErrorType for DigitalIn<P, N> {
    type Error = Infallible;
}

impl<const P: char, const N: u8> InputPin for DigitalIn<P, N> {
    #[inline]
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_high())
    }

    #[inline]
    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pin.is_low())
    }
}
