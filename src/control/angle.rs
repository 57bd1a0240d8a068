// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Shaft angle and angular velocity estimation from a raw rotation counter.
//!
//! Angles are reported in degrees, wrapped into `[0, 360)`. Velocity is derived from two successive
//! samples using the shortest angular path between them, so a crossing of the 0°/360° seam does
//! not show up as a spike.

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_360(deg: f32) -> f32 {
    let mut wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    // -1e-9 % 360 + 360 rounds up to exactly 360.0 in f32
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Map an angular difference into `(-180, 180]`.
pub fn wrap_shortest(delta_deg: f32) -> f32 {
    let wrapped = wrap_360(delta_deg);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Last accepted sample.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngleState {
    pub current_deg: f32,
    pub previous_deg: f32,
    pub timestamp_ms: u32,
}

/// Converts encoder counts into angle and velocity.
pub struct AngleEstimator {
    counts_per_rev: f32,
    min_dt_s: f32,
    state: Option<AngleState>,
}

impl AngleEstimator {
    /// Create an estimator for a sensor with `counts_per_rev` counts per shaft revolution.
    pub fn new(counts_per_rev: f32) -> Self {
        Self {
            counts_per_rev,
            min_dt_s: 1e-6,
            state: None,
        }
    }

    /// Smallest sample spacing (seconds) accepted for a velocity estimate.
    pub fn with_min_dt(mut self, min_dt_s: f32) -> Self {
        self.min_dt_s = min_dt_s;
        self
    }

    /// Unwrapped angle in degrees for a raw count.
    #[inline]
    pub fn continuous_angle(&self, count: i32) -> f32 {
        (count as f32 / self.counts_per_rev) * 360.0
    }

    /// Angle in degrees for a raw count, wrapped into `[0, 360)`.
    #[inline]
    pub fn angle(&self, count: i32) -> f32 {
        wrap_360(self.continuous_angle(count))
    }

    /// Feed a new sample.
    ///
    /// Returns the velocity in deg/s, or `None` on the first sample after a reset and whenever
    /// the measured spacing to the previous sample is not strictly positive. In the latter case the
    /// previous sample is kept so the next call measures from it.
    pub fn sample(&mut self, count: i32, now_ms: u32) -> Option<f32> {
        let angle = self.angle(count);

        let Some(prev) = self.state else {
            self.state = Some(AngleState {
                current_deg: angle,
                previous_deg: angle,
                timestamp_ms: now_ms,
            });
            return None;
        };

        let dt = now_ms.wrapping_sub(prev.timestamp_ms) as f32 / 1000.0;
        if !(dt >= self.min_dt_s) {
            return None;
        }

        let velocity = wrap_shortest(angle - prev.current_deg) / dt;
        self.state = Some(AngleState {
            current_deg: angle,
            previous_deg: prev.current_deg,
            timestamp_ms: now_ms,
        });
        Some(velocity)
    }

    /// Forget the previous sample; the next [`sample`](Self::sample) only re-primes.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// True once at least one sample has been taken since the last reset.
    #[inline]
    pub fn is_primed(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn state(&self) -> Option<AngleState> {
        self.state
    }
}
