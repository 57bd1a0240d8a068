// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Single-channel slotted-disc encoder.
//!
//! The photo-interrupter output is sampled on every [`poll`](RotationSensor::poll) and each
//! low-to-high transition counts one slit. There is no direction channel, so the count only ever
//! increases; the sign of travel has to come from the command driving the motor.

use embedded_hal::digital::InputPin;

use crate::motors::RotationSensor;

pub struct SlitEncoder<P> {
    pin: P,
    count: i32,
    last_high: bool,
}

impl<P: InputPin> SlitEncoder<P> {
    pub fn new(mut pin: P) -> Self {
        let last_high = pin.is_high().unwrap_or(false);
        Self {
            pin,
            count: 0,
            last_high,
        }
    }

    pub fn free(self) -> P {
        self.pin
    }
}

impl<P: InputPin> RotationSensor for SlitEncoder<P> {
    fn count(&self) -> i32 {
        self.count
    }

    fn zero(&mut self) {
        self.count = 0;
    }

    fn poll(&mut self) {
        // Read errors keep the previous level.
        let high = self.pin.is_high().unwrap_or(self.last_high);
        if high && !self.last_high {
            self.count = self.count.wrapping_add(1);
        }
        self.last_high = high;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Levels {
        seq: &'static [bool],
        pos: usize,
    }

    impl embedded_hal::digital::ErrorType for Levels {
        type Error = Infallible;
    }

    impl InputPin for Levels {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let level = self.seq[self.pos.min(self.seq.len() - 1)];
            self.pos += 1;
            Ok(level)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    #[test]
    fn counts_rising_edges_only() {
        // first level is consumed by `new`
        let seq = &[false, true, true, false, true, false, false, true];
        let mut enc = SlitEncoder::new(Levels { seq, pos: 0 });
        for _ in 1..seq.len() {
            enc.poll();
        }
        assert_eq!(enc.count(), 3);
        enc.zero();
        assert_eq!(enc.count(), 0);
    }

    #[test]
    fn starting_high_is_not_an_edge() {
        let mut enc = SlitEncoder::new(Levels {
            seq: &[true, true, true],
            pos: 0,
        });
        enc.poll();
        enc.poll();
        assert_eq!(enc.count(), 0);
    }
}
