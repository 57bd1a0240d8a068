// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Quadrature encoder support via STM32F7 timers in encoder mode.
//!
//! This module configures TIM2 (32-bit) for encoder mode and exposes it as a
//! [`RotationSensor`]. Counting happens entirely in hardware, so [`RotationSensor::poll`] is a
//! no-op.

use stm32f7xx_hal::pac;

use crate::motors::RotationSensor;

pub struct Encoder<TIM> {
    tim: TIM,
}

impl<TIM> Encoder<TIM> {
    /// Consume the wrapper and return the underlying timer peripheral.
    #[inline]
    pub fn free(self) -> TIM {
        self.tim
    }
}

impl Encoder<pac::TIM2> {
    /// Configure TIM2 as a quadrature encoder with full 32-bit range.
    ///
    /// CH1/CH2 must already be routed to the timer (PA0/PA1, AF1).
    pub fn tim2(tim2: pac::TIM2) -> Self {
        let tim = tim2;

        // Clock the timer
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim2en().set_bit());

        // Disable counter while configuring
        tim.cr1.modify(|_, w| w.cen().clear_bit());

        // Auto-reload: max 32-bit
        tim.arr.write(|w| w.bits(0xFFFF_FFFF));

        // Slave mode: encoder mode 3 (count on both TI1 and TI2)
        tim.smcr.modify(|_, w| w.sms().bits(0b011));

        // Configure CH1/CH2 as inputs from TI1/TI2
        tim.ccmr1_input().modify(|_, w| w.cc1s().ti1().cc2s().ti2());

        // Polarity and enable for both channels.
        tim.ccer.modify(|_, w| {
            w.cc1p()
                .clear_bit()
                .cc2p()
                .clear_bit()
                .cc1e()
                .set_bit()
                .cc2e()
                .set_bit()
        });

        tim.cnt.write(|w| w.bits(0));
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Read the raw 32-bit counter value.
    #[inline]
    pub fn raw(&self) -> u32 {
        self.tim.cnt.read().cnt().bits()
    }
}

impl RotationSensor for Encoder<pac::TIM2> {
    /// Counter reinterpreted as signed, so reverse travel from zero reads negative.
    #[inline]
    fn count(&self) -> i32 {
        self.raw() as i32
    }

    #[inline]
    fn zero(&mut self) {
        self.tim.cnt.write(|w| w.bits(0));
    }
}
