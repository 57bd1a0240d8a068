// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Angular PID controller for closed-loop position control.
//!
//! Works in `no_std` and does not allocate memory.
//!
//! The integral is clamped for anti-windup and the derivative of the error is passed through a
//! first-order low-pass filter. The output is not clamped here; saturation and deadzone are
//! applied by [`DriveMapper`](crate::control::DriveMapper).

use super::angle::wrap_shortest;

/// Proportional, integral and derivative gains.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// PID controller with integral clamping and a filtered derivative.
pub struct Pid {
    /// Proportional gain
    kp: f32,
    /// Integral gain
    ki: f32,
    /// Derivative gain
    kd: f32,

    /// Accumulated error (deg·s)
    integral: f32,
    /// Error from the previous update (for derivative term)
    prev_error: f32,
    /// Low-pass filtered derivative of the error
    filtered_derivative: f32,
    /// Weight of the newest raw derivative in the filter, in `[0, 1]`
    alpha: f32,

    /// Integral anti-windup clamp
    int_min: f32,
    int_max: f32,

    /// Take the shortest way around the circle when computing the error.
    shortest_path: bool,

    last_error: f32,
    output: f32,
}

impl Pid {
    /// Create a new PID controller.
    ///
    /// Defaults: integral limits `[-100, 100]`, derivative filter `alpha = 0.2`, shortest-path
    /// angular error.
    pub fn new(gains: Gains) -> Self {
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,

            integral: 0.0,
            prev_error: 0.0,
            filtered_derivative: 0.0,
            alpha: 0.2,

            int_min: -100.0,
            int_max: 100.0,

            shortest_path: true,

            last_error: 0.0,
            output: 0.0,
        }
    }

    /// Set integral limits for anti-windup.
    pub fn with_integral_limits(mut self, min: f32, max: f32) -> Self {
        self.int_min = min;
        self.int_max = max;
        self
    }

    /// Set the derivative filter coefficient (`1.0` disables filtering).
    pub fn with_derivative_filter(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Choose between shortest-path (wrapped) error and a plain difference.
    pub fn with_shortest_path(mut self, enabled: bool) -> Self {
        self.shortest_path = enabled;
        self
    }

    #[inline]
    pub fn gains(&self) -> Gains {
        Gains::new(self.kp, self.ki, self.kd)
    }

    /// Replace the gains. The integral is cleared so stale windup is not rescaled by the new `ki`.
    pub fn set_gains(&mut self, gains: Gains) {
        self.kp = gains.kp;
        self.ki = gains.ki;
        self.kd = gains.kd;
        self.integral = 0.0;
    }

    /// Clear the integrator only. Derivative history is kept.
    #[inline]
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }

    #[inline]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Error used by the most recent update.
    #[inline]
    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    /// Output of the most recent update.
    #[inline]
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Control error for `setpoint` and `measurement` (degrees).
    pub fn error(&self, setpoint: f32, measurement: f32) -> f32 {
        let raw = setpoint - measurement;
        if self.shortest_path {
            wrap_shortest(raw)
        } else {
            raw
        }
    }

    /// Update the controller.
    ///
    /// `setpoint`: desired angle (deg)
    /// `measurement`: current angle (deg)
    /// `dt`: measured time since the previous update in seconds
    ///
    /// A `dt` that is not strictly positive skips the update and returns the previous output with
    /// the controller state untouched.
    pub fn update(&mut self, setpoint: f32, measurement: f32, dt: f32) -> f32 {
        if !(dt > 0.0) || !dt.is_finite() {
            return self.output;
        }

        let error = self.error(setpoint, measurement);

        // ----- P term -----
        let p = self.kp * error;

        // ----- I term -----
        self.integral = (self.integral + error * dt).clamp(self.int_min, self.int_max);
        let i = self.ki * self.integral;

        // ----- D term (low-pass filtered) -----
        let raw_derivative = (error - self.prev_error) / dt;
        self.filtered_derivative =
            self.alpha * raw_derivative + (1.0 - self.alpha) * self.filtered_derivative;
        let d = self.kd * self.filtered_derivative;

        self.prev_error = error;
        self.last_error = error;
        self.output = p + i + d;
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn error_takes_short_way() {
        let pid = Pid::new(Gains::new(1.0, 0.0, 0.0));
        assert_relative_eq!(pid.error(200.0, 190.0), 10.0);
        assert_relative_eq!(pid.error(10.0, 350.0), 20.0, epsilon = 1e-4);
        assert_relative_eq!(pid.error(350.0, 10.0), -20.0, epsilon = 1e-4);
    }

    #[test]
    fn plain_error_when_shortest_path_disabled() {
        let pid = Pid::new(Gains::new(1.0, 0.0, 0.0)).with_shortest_path(false);
        assert_relative_eq!(pid.error(10.0, 350.0), -340.0);
    }

    #[test]
    fn proportional_only() {
        let mut pid = Pid::new(Gains::new(2.0, 0.0, 0.0));
        let u = pid.update(200.0, 190.0, 0.01);
        assert_relative_eq!(u, 20.0);
        assert_relative_eq!(pid.last_error(), 10.0);
    }

    #[test]
    fn integral_stays_clamped() {
        let mut pid = Pid::new(Gains::new(0.0, 1.0, 0.0)).with_integral_limits(-100.0, 100.0);
        let errors = [170.0, -170.0, 90.0, 179.0, -5.0, 180.0];
        let dts = [0.01, 0.5, 3.0, 10.0, 0.001];
        for n in 0..500 {
            let e = errors[n % errors.len()];
            let dt = dts[n % dts.len()];
            let sign = if n % 97 < 60 { 1.0 } else { -1.0 };
            pid.update(sign * e, 0.0, dt);
            assert!(pid.integral() >= -100.0 && pid.integral() <= 100.0);
        }
    }

    #[test]
    fn integral_saturates_under_sustained_error() {
        let mut pid = Pid::new(Gains::new(0.0, 2.0, 0.0)).with_integral_limits(-100.0, 100.0);
        for _ in 0..1000 {
            pid.update(100.0, 0.0, 0.01);
        }
        assert_relative_eq!(pid.integral(), 100.0);
        assert_relative_eq!(pid.output(), 200.0);
    }

    #[test]
    fn derivative_is_filtered() {
        let mut pid = Pid::new(Gains::new(0.0, 0.0, 1.0)).with_derivative_filter(0.2);
        // error jumps 0 -> 10 in 0.1 s: raw derivative 100, filtered 0.2 * 100
        let u = pid.update(10.0, 0.0, 0.1);
        assert_relative_eq!(u, 20.0, epsilon = 1e-4);
        // error constant: raw derivative 0, filter decays by 0.8
        let u = pid.update(10.0, 0.0, 0.1);
        assert_relative_eq!(u, 16.0, epsilon = 1e-4);
    }

    #[test]
    fn set_gains_clears_integral() {
        let mut pid = Pid::new(Gains::new(1.0, 1.0, 0.0));
        pid.update(50.0, 0.0, 0.5);
        assert!(pid.integral() > 0.0);
        pid.set_gains(Gains::new(10.5, 5.2, 2.1));
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.gains(), Gains::new(10.5, 5.2, 2.1));
    }

    #[test]
    fn non_positive_dt_skips_update() {
        let mut pid = Pid::new(Gains::new(1.0, 1.0, 1.0));
        let u = pid.update(10.0, 0.0, 0.01);
        let integral = pid.integral();
        assert_eq!(pid.update(90.0, 0.0, 0.0), u);
        assert_eq!(pid.update(90.0, 0.0, -0.01), u);
        assert_eq!(pid.update(90.0, 0.0, f32::NAN), u);
        assert_eq!(pid.integral(), integral);
    }
}
