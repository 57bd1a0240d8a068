// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Open-loop system identification.
//!
//! The state machine steps the motor through an ordered list of duty levels. For each level it
//! drives the motor, tracks the steady-state speed with an exponential moving average once the
//! response has settled, and latches the time constant as the time at which the speed first
//! reaches 63.2% of the step change. The sweep never terminates: after the last level it pauses
//! and starts again from the first.
//!
//! ```text
//!            levels left                dwell expired              stop expired
//! StartMotor ──────────► WaitSteady ──────────────────► WaitStopped ─────────────► StartMotor
//!     │ list exhausted                                                                 ▲
//!     └──────────────► InterCycleDelay ────────────────────────────────────────────────┘
//!                                         pause expired
//! ```
//!
//! The machine itself never touches hardware; every side effect is returned as an [`Effect`].

use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

use super::drive::ActuatorCommand;
use crate::config::IdentificationConfig;

/// Current phase of the sweep. Timed states carry their entry time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    StartMotor,
    WaitSteady { since_ms: u32 },
    WaitStopped { since_ms: u32 },
    InterCycleDelay { since_ms: u32 },
}

/// Input to the state machine.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Passage of time; drives the timed transitions.
    Tick { now_ms: u32 },
    /// A fresh velocity estimate.
    Velocity { now_ms: u32, deg_per_s: f32 },
}

/// Result of crossing the rise threshold.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TauMeasurement {
    pub duty: u16,
    pub time_ms: u32,
    pub tau_s: f32,
    pub start_velocity: f32,
    pub steady_state_velocity: f32,
    pub threshold: f32,
}

/// Side effect requested by a transition.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// A new level is about to be driven. `index` is zero-based.
    RunStarted { index: usize, total: usize, duty: u16 },
    /// Apply this command to the actuator.
    Drive(ActuatorCommand),
    /// The dwell at the current level has elapsed.
    SteadyReached,
    /// The motor has been stopped long enough.
    Stopped,
    /// The time constant of the current run was measured.
    Tau(TauMeasurement),
    /// Every level was visited; the pause before the next sweep begins.
    CycleComplete,
}

pub type Effects = Vec<Effect, 4>;

/// Rise threshold: `start + (steady - start) * fraction`.
#[inline]
pub fn rise_threshold(start_velocity: f32, steady_state_velocity: f32, fraction: f32) -> f32 {
    start_velocity + (steady_state_velocity - start_velocity) * fraction
}

/// Measurement state of one drive level.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdentificationRun {
    pub duty: u16,
    /// Speed magnitude when the step was applied (ideally ~0).
    pub start_velocity: f32,
    /// EMA of the post-settle speed magnitude; `None` until the first post-settle sample.
    pub steady_state_velocity: Option<f32>,
    pub rise_start_ms: u32,
    pub tau_s: Option<f32>,
}

impl IdentificationRun {
    fn new(duty: u16, start_velocity: f32, rise_start_ms: u32) -> Self {
        Self {
            duty,
            start_velocity,
            steady_state_velocity: None,
            rise_start_ms,
            tau_s: None,
        }
    }

    #[inline]
    pub fn tau_latched(&self) -> bool {
        self.tau_s.is_some()
    }

    /// Feed one speed sample taken `dwell_ms` after the step. Returns the measurement the first
    /// time the threshold is crossed; never again for this run.
    fn observe(
        &mut self,
        cfg: &IdentificationConfig,
        now_ms: u32,
        dwell_ms: u32,
        speed: f32,
    ) -> Option<TauMeasurement> {
        if self.tau_latched() {
            return None;
        }

        if dwell_ms >= cfg.settle_delay_ms {
            let w = cfg.ema_history_weight;
            self.steady_state_velocity = Some(match self.steady_state_velocity {
                None => speed,
                Some(avg) => w * avg + (1.0 - w) * speed,
            });
        }

        let steady = self.steady_state_velocity?;
        if steady <= cfg.min_steady_velocity {
            return None;
        }

        let threshold = rise_threshold(self.start_velocity, steady, cfg.rise_fraction);
        if speed < threshold {
            return None;
        }

        let tau_s = now_ms.wrapping_sub(self.rise_start_ms) as f32 / 1000.0;
        self.tau_s = Some(tau_s);
        Some(TauMeasurement {
            duty: self.duty,
            time_ms: now_ms,
            tau_s,
            start_velocity: self.start_velocity,
            steady_state_velocity: steady,
            threshold,
        })
    }
}

/// Duty sweep with steady-state detection and time-constant extraction.
pub struct IdentificationStateMachine {
    cfg: IdentificationConfig,
    state: State,
    duty_index: usize,
    run: IdentificationRun,
    last_velocity: f32,
}

impl IdentificationStateMachine {
    pub fn new(cfg: IdentificationConfig) -> Self {
        Self {
            cfg,
            state: State::StartMotor,
            duty_index: 0,
            run: IdentificationRun::new(0, 0.0, 0),
            last_velocity: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn duty_index(&self) -> usize {
        self.duty_index
    }

    #[inline]
    pub fn run(&self) -> &IdentificationRun {
        &self.run
    }

    /// Duty currently applied by the sweep (0 while stopped).
    pub fn active_duty(&self) -> u16 {
        match self.state {
            State::WaitSteady { .. } => self.run.duty,
            _ => 0,
        }
    }

    /// Advance the machine by one event.
    pub fn step(&mut self, event: Event) -> Effects {
        let mut effects = Effects::new();

        match (self.state, event) {
            (State::StartMotor, Event::Tick { now_ms }) => self.start_next(now_ms, &mut effects),

            (State::WaitSteady { since_ms }, Event::Tick { now_ms })
                if now_ms.wrapping_sub(since_ms) >= self.cfg.steady_time_ms =>
            {
                push(&mut effects, Effect::SteadyReached);
                push(&mut effects, Effect::Drive(ActuatorCommand::STOP));
                self.state = State::WaitStopped { since_ms: now_ms };
            }

            (State::WaitStopped { since_ms }, Event::Tick { now_ms })
                if now_ms.wrapping_sub(since_ms) >= self.cfg.stop_time_ms =>
            {
                push(&mut effects, Effect::Stopped);
                self.duty_index += 1;
                self.state = State::StartMotor;
            }

            (State::InterCycleDelay { since_ms }, Event::Tick { now_ms })
                if now_ms.wrapping_sub(since_ms) >= self.cfg.inter_cycle_pause_ms =>
            {
                self.state = State::StartMotor;
            }

            (
                State::WaitSteady { since_ms },
                Event::Velocity {
                    now_ms,
                    deg_per_s,
                },
            ) => {
                self.last_velocity = deg_per_s;
                let dwell_ms = now_ms.wrapping_sub(since_ms);
                if let Some(tau) = self
                    .run
                    .observe(&self.cfg, now_ms, dwell_ms, deg_per_s.abs())
                {
                    push(&mut effects, Effect::Tau(tau));
                }
            }

            (_, Event::Velocity { deg_per_s, .. }) => self.last_velocity = deg_per_s,

            (
                State::WaitSteady { .. } | State::WaitStopped { .. } | State::InterCycleDelay { .. },
                Event::Tick { .. },
            ) => {}
        }

        effects
    }

    fn start_next(&mut self, now_ms: u32, effects: &mut Effects) {
        let total = self.cfg.duties.len();
        let Some(&duty) = self.cfg.duties.get(self.duty_index) else {
            self.duty_index = 0;
            push(effects, Effect::CycleComplete);
            self.state = State::InterCycleDelay { since_ms: now_ms };
            return;
        };

        self.run = IdentificationRun::new(duty, self.last_velocity.abs(), now_ms);
        push(
            effects,
            Effect::RunStarted {
                index: self.duty_index,
                total,
                duty,
            },
        );
        push(
            effects,
            Effect::Drive(ActuatorCommand::new(self.cfg.direction, duty)),
        );
        self.state = State::WaitSteady { since_ms: now_ms };
    }
}

// Capacity covers the longest transition (two effects).
fn push(effects: &mut Effects, effect: Effect) {
    let pushed = effects.push(effect);
    debug_assert!(pushed.is_ok(), "effect list overflow");
}
