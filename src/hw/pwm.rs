// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Single-channel PWM on TIM4 CH1 (PD12, AF2), used as the H-bridge enable line.
//!
//! The timer is programmed directly through the PAC. The counter runs at `pwm_hz * RESOLUTION`, so
//! the duty cycle has [`RESOLUTION`] steps.

use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use stm32f7xx_hal::pac;

/// Counter ticks per PWM period.
pub const RESOLUTION: u16 = 1000;

// TIMx_CCMR1: OC1M = 110 (PWM mode 1), OC1PE
const CCMR1_OC1_PWM1: u32 = (0b110 << 4) | (1 << 3);
// TIMx_CR1
const CR1_CEN: u32 = 1 << 0;
const CR1_ARPE: u32 = 1 << 7;
// TIMx_CCER
const CCER_CC1E: u32 = 1 << 0;
// TIMx_EGR
const EGR_UG: u32 = 1 << 0;

pub struct Pwm<TIM> {
    tim: TIM,
}

impl<TIM> Pwm<TIM> {
    #[inline]
    pub fn free(self) -> TIM {
        self.tim
    }
}

impl Pwm<pac::TIM4> {
    /// Start TIM4 CH1 at `pwm_hz` with 0% duty.
    ///
    /// `timer_clock_hz` is the APB1 timer clock (`clocks.timclk1()`).
    pub fn tim4(tim4: pac::TIM4, timer_clock_hz: u32, pwm_hz: u32) -> Self {
        let tim = tim4;

        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());

        tim.cr1.write(|w| unsafe { w.bits(0) });

        let counter_hz = pwm_hz.max(1) * RESOLUTION as u32;
        let psc = (timer_clock_hz / counter_hz).max(1) - 1;
        tim.psc.write(|w| unsafe { w.bits(psc) });
        tim.arr.write(|w| unsafe { w.bits(RESOLUTION as u32 - 1) });
        tim.ccr1.write(|w| unsafe { w.bits(0) });

        tim.ccmr1_output()
            .modify(|r, w| unsafe { w.bits((r.bits() & !0xFF) | CCMR1_OC1_PWM1) });
        tim.ccer
            .modify(|r, w| unsafe { w.bits(r.bits() | CCER_CC1E) });

        // Load PSC/ARR/CCR1 from their preload registers
        tim.egr.write(|w| unsafe { w.bits(EGR_UG) });
        tim.cr1.write(|w| unsafe { w.bits(CR1_ARPE | CR1_CEN) });

        Self { tim }
    }
}

impl ErrorType for Pwm<pac::TIM4> {
    type Error = Infallible;
}

impl SetDutyCycle for Pwm<pac::TIM4> {
    #[inline]
    fn max_duty_cycle(&self) -> u16 {
        RESOLUTION
    }

    /// `duty == RESOLUTION` keeps CCR1 above ARR, i.e. output permanently high.
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        let duty = duty.min(RESOLUTION) as u32;
        self.tim.ccr1.write(|w| unsafe { w.bits(duty) });
        Ok(())
    }
}
