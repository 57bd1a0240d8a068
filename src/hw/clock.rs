// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Millisecond time base on SysTick.
//!
//! SysTick fires at 1 kHz and bumps a global counter. The counter is a wrapping `u32`; every
//! consumer compares timestamps with `wrapping_sub`.

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::{syst::SystClkSource, SYST};
use cortex_m_rt::exception;

static MILLIS: AtomicU32 = AtomicU32::new(0);

pub struct Millis {
    _syst: SYST,
}

impl Millis {
    /// Start SysTick at 1 kHz from the core clock.
    pub fn start(mut syst: SYST, sysclk_hz: u32) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(sysclk_hz / 1000 - 1);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();
        Self { _syst: syst }
    }

    #[inline]
    pub fn now(&self) -> u32 {
        MILLIS.load(Ordering::Relaxed)
    }

    /// Busy-wait for `ms` milliseconds.
    pub fn delay_ms(&self, ms: u32) {
        let start = self.now();
        while self.now().wrapping_sub(start) < ms {
            cortex_m::asm::nop();
        }
    }
}

#[exception]
fn SysTick() {
    MILLIS.fetch_add(1, Ordering::Relaxed);
}
