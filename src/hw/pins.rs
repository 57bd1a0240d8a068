// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F767ZI devboard motor bench.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiod, Alternate},
    pac,
    prelude::*,
};

use super::gpio::{DigitalIn, DigitalOut};

/// All board pins. Construct this once at startup using:
///
/// ```rust,ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOD, dp.GPIOE);
/// ```
pub struct BoardPins {
    pub usart3: Usart3Pins,
    pub encoder: EncoderPins,
    pub bridge: BridgePins,
    /// Slit-disc photo-interrupter output
    pub slit: DigitalIn<'E', 6>,
}

/// USART3 via ST-LINK virtual COM port
pub struct Usart3Pins {
    pub tx: gpiod::PD8<Alternate<7>>,
    pub rx: gpiod::PD9<Alternate<7>>,
}

/// TIM2 Quadrature Encoder Inputs
pub struct EncoderPins {
    pub ch1: gpioa::PA0<Alternate<1>>,
    pub ch2: gpioa::PA1<Alternate<1>>,
}

/// H-bridge control pins
pub struct BridgePins {
    pub ena: gpiod::PD12<Alternate<2>>, // TIM4_CH1 (PWM)
    pub in1: DigitalOut<'E', 4>,
    pub in2: DigitalOut<'E', 5>,
}

impl BoardPins {
    pub fn new(gpioa: pac::GPIOA, gpiod: pac::GPIOD, gpioe: pac::GPIOE) -> Self {
        let gpioa = gpioa.split();
        let gpiod = gpiod.split();
        let gpioe = gpioe.split();

        Self {
            usart3: Usart3Pins {
                tx: gpiod.pd8.into_alternate::<7>(),
                rx: gpiod.pd9.into_alternate::<7>(),
            },

            encoder: EncoderPins {
                ch1: gpioa.pa0.into_alternate::<1>(),
                ch2: gpioa.pa1.into_alternate::<1>(),
            },

            bridge: BridgePins {
                ena: gpiod.pd12.into_alternate::<2>(),
                in1: DigitalOut::new(gpioe.pe4),
                in2: DigitalOut::new(gpioe.pe5),
            },

            slit: DigitalIn::pull_up(gpioe.pe6),
        }
    }
}
