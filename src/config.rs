// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Firmware configuration.
//!
//! Every tunable number used by the control loop and the identification sweep lives here, so a
//! test can shorten the timings without touching the algorithms. [`Config::for_task`] produces the
//! presets flashed on the bench.

use heapless::Vec;

use crate::control::{Direction, Gains};
use crate::telemetry::Verbosity;

/* --------------------------- Sensor -------------------------- */
/// Quadrature counts per output shaft revolution.
pub const QUADRATURE_COUNTS_PER_REV: f32 = 374.0;
/// Slit disc: 12 slits + 12 wings, one count per rising edge.
pub const SLIT_COUNTS_PER_REV: f32 = 24.0;

/* --------------------------- Loop timing -------------------------- */
pub const CONTROL_PERIOD_MS: u32 = 10;
pub const SAMPLE_PERIOD_MS: u32 = 50;
/// Time given to the host to open the port before the banner.
pub const STARTUP_DELAY_MS: u32 = 2000;

/* --------------------------- PID -------------------------- */
pub const POSITION_GAINS: Gains = Gains::new(0.0, 1.663, 7.117);
pub const TUNING_GAINS: Gains = Gains::new(0.0, 0.0, 0.0);
pub const DERIVATIVE_ALPHA: f32 = 0.2;
pub const INTEGRAL_MIN: f32 = -100.0;
pub const INTEGRAL_MAX: f32 = 100.0;

/* --------------------------- Drive -------------------------- */
pub const PWM_MAX: u16 = 255;
pub const PWM_DEADZONE: f32 = 50.0;

/* --------------------------- Identification -------------------------- */
pub const MAX_DUTIES: usize = 16;
pub const DEFAULT_DUTIES: [u16; 5] = [150, 175, 200, 225, 250];
pub const STEP_RESPONSE_DUTY: u16 = 200;

/* --------------------------- Build selection -------------------------- */
/// Task flashed into the board image, picked with one of the `task-*` features.
///
/// Without a `task-*` feature the image runs [`Task::Position`]. If several are enabled the first
/// in this order wins: stop, step, identification, tuning.
pub const BUILD_TASK: Task = if cfg!(feature = "task-stop") {
    Task::Stop
} else if cfg!(feature = "task-step") {
    Task::StepResponse {
        duty: STEP_RESPONSE_DUTY,
    }
} else if cfg!(feature = "task-identification") {
    Task::Identification
} else if cfg!(feature = "task-tuning") {
    Task::Tuning
} else {
    Task::Position
};

/// Which firmware behaviour the loop runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    /// Actuator held at stop, nothing emitted.
    Stop,
    /// Open-loop step at a fixed duty, velocity telemetry.
    StepResponse { duty: u16 },
    /// Automatic duty sweep with time-constant extraction.
    Identification,
    /// Closed-loop position control on the wrapped angle.
    Position,
    /// Closed-loop control on the continuous angle, protocol lines only.
    Tuning,
}

impl Task {
    /// Identifier printed in the `TASK:` banner.
    pub fn banner_id(&self) -> Option<&'static str> {
        match self {
            Task::Stop => None,
            Task::StepResponse { .. } => Some("1-1"),
            Task::Identification => Some("1-2"),
            Task::Position => Some("2-1"),
            Task::Tuning => Some("KP_TUNING"),
        }
    }

    /// True for the tasks driven by the PID controller.
    #[inline]
    pub fn is_closed_loop(&self) -> bool {
        matches!(self, Task::Position | Task::Tuning)
    }
}

/// Timing and thresholds of the open-loop identification sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentificationConfig {
    /// Drive levels visited in order, then repeated.
    pub duties: Vec<u16, MAX_DUTIES>,
    /// Direction used for every open-loop step.
    pub direction: Direction,
    /// Time the motor is driven at each level.
    pub steady_time_ms: u32,
    /// Time after the step before samples feed the steady-state average.
    pub settle_delay_ms: u32,
    /// Time the motor is held stopped between levels.
    pub stop_time_ms: u32,
    /// Pause after the last level before the sweep restarts.
    pub inter_cycle_pause_ms: u32,
    /// Weight of the accumulated average in the EMA update.
    pub ema_history_weight: f32,
    /// Fraction of the step change that defines the time constant.
    pub rise_fraction: f32,
    /// Steady-state velocity (deg/s) below which no time constant is extracted.
    pub min_steady_velocity: f32,
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            duties: Vec::from_slice(&DEFAULT_DUTIES).unwrap_or_default(),
            direction: Direction::Forward,
            steady_time_ms: 5000,
            settle_delay_ms: 3000,
            stop_time_ms: 2000,
            inter_cycle_pause_ms: 3000,
            ema_history_weight: 0.9,
            rise_fraction: 0.632,
            min_steady_velocity: 50.0,
        }
    }
}

impl IdentificationConfig {
    /// Replace the duty list. Entries beyond [`MAX_DUTIES`] are dropped.
    pub fn with_duties(mut self, duties: &[u16]) -> Self {
        self.duties.clear();
        for &duty in duties.iter().take(MAX_DUTIES) {
            let _ = self.duties.push(duty);
        }
        self
    }

    /// Override the four dwell timings at once.
    pub fn with_timings(
        mut self,
        steady_time_ms: u32,
        settle_delay_ms: u32,
        stop_time_ms: u32,
        inter_cycle_pause_ms: u32,
    ) -> Self {
        self.steady_time_ms = steady_time_ms;
        self.settle_delay_ms = settle_delay_ms;
        self.stop_time_ms = stop_time_ms;
        self.inter_cycle_pause_ms = inter_cycle_pause_ms;
        self
    }
}

/// Complete configuration of one firmware image.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub task: Task,
    pub counts_per_rev: f32,
    pub control_period_ms: u32,
    pub sample_period_ms: u32,
    /// Smallest sample spacing accepted for a velocity estimate.
    pub min_dt_s: f32,
    pub gains: Gains,
    pub derivative_alpha: f32,
    pub integral_min: f32,
    pub integral_max: f32,
    pub pwm_max: u16,
    pub deadzone: f32,
    pub initial_reference: f32,
    pub verbosity: Verbosity,
    pub identification: IdentificationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_task(Task::Position)
    }
}

impl Config {
    /// Bench preset for `task`.
    pub fn for_task(task: Task) -> Self {
        let (gains, initial_reference, verbosity) = match task {
            Task::Position => (POSITION_GAINS, 200.0, Verbosity::Normal),
            Task::Tuning => (TUNING_GAINS, 0.0, Verbosity::Quiet),
            Task::Stop => (TUNING_GAINS, 0.0, Verbosity::Quiet),
            Task::StepResponse { .. } => (TUNING_GAINS, 0.0, Verbosity::Quiet),
            Task::Identification => (TUNING_GAINS, 0.0, Verbosity::Normal),
        };

        Self {
            task,
            counts_per_rev: QUADRATURE_COUNTS_PER_REV,
            control_period_ms: CONTROL_PERIOD_MS,
            sample_period_ms: SAMPLE_PERIOD_MS,
            min_dt_s: 1e-6,
            gains,
            derivative_alpha: DERIVATIVE_ALPHA,
            integral_min: INTEGRAL_MIN,
            integral_max: INTEGRAL_MAX,
            pwm_max: PWM_MAX,
            deadzone: PWM_DEADZONE,
            initial_reference,
            verbosity,
            identification: IdentificationConfig::default(),
        }
    }

    pub fn with_counts_per_rev(mut self, counts_per_rev: f32) -> Self {
        self.counts_per_rev = counts_per_rev;
        self
    }

    pub fn with_periods(mut self, control_period_ms: u32, sample_period_ms: u32) -> Self {
        self.control_period_ms = control_period_ms;
        self.sample_period_ms = sample_period_ms;
        self
    }

    pub fn with_gains(mut self, gains: Gains) -> Self {
        self.gains = gains;
        self
    }

    pub fn with_reference(mut self, reference: f32) -> Self {
        self.initial_reference = reference;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_identification(mut self, identification: IdentificationConfig) -> Self {
        self.identification = identification;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(any(
        feature = "task-stop",
        feature = "task-step",
        feature = "task-identification",
        feature = "task-tuning"
    )))]
    fn default_image_runs_position_control() {
        assert_eq!(BUILD_TASK, Task::Position);
        assert_eq!(BUILD_TASK.banner_id(), Some("2-1"));
    }

    #[test]
    fn presets_match_bench_firmware() {
        let position = Config::for_task(Task::Position);
        assert_eq!(position.gains, Gains::new(0.0, 1.663, 7.117));
        assert_eq!(position.initial_reference, 200.0);
        assert_eq!(position.control_period_ms, 10);

        let tuning = Config::for_task(Task::Tuning);
        assert_eq!(tuning.gains, Gains::new(0.0, 0.0, 0.0));
        assert_eq!(tuning.verbosity, Verbosity::Quiet);

        let ident = Config::for_task(Task::Identification);
        assert_eq!(ident.identification.duties.as_slice(), &[150, 175, 200, 225, 250]);
        assert_eq!(ident.sample_period_ms, 50);
    }

    #[test]
    fn banner_ids() {
        assert_eq!(Task::Stop.banner_id(), None);
        assert_eq!(Task::StepResponse { duty: 200 }.banner_id(), Some("1-1"));
        assert_eq!(Task::Identification.banner_id(), Some("1-2"));
        assert_eq!(Task::Position.banner_id(), Some("2-1"));
        assert_eq!(Task::Tuning.banner_id(), Some("KP_TUNING"));
    }

    #[test]
    fn duty_list_is_truncated() {
        let many: [u16; 20] = [100; 20];
        let cfg = IdentificationConfig::default().with_duties(&many);
        assert_eq!(cfg.duties.len(), MAX_DUTIES);
    }
}
