// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Text telemetry written to the serial port.
//!
//! Every line is CRLF-terminated. Protocol lines (`TASK:`, `Data:`, `Tau:`, `ZEROED`) are read by
//! the host-side logger and are always emitted; free-form diagnostic lines are only written at
//! [`Verbosity::Normal`].
//!
//! Write errors from the sink are ignored. Telemetry must never stall the control loop.

use core::fmt::{self, Write};

use crate::control::identification::TauMeasurement;

/// How chatty the diagnostic output is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verbosity {
    /// Protocol lines only, for scripted hosts.
    Quiet,
    /// Protocol lines plus human-readable progress.
    Normal,
}

/// Milliseconds rendered as seconds with three decimals, without going through `f32`.
#[derive(Copy, Clone, Debug)]
pub struct Seconds(pub u32);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1000, self.0 % 1000)
    }
}

/// One closed-loop control tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionSample {
    pub time_ms: u32,
    pub position_deg: f32,
    pub reference_deg: f32,
    pub error_deg: f32,
    pub control: f32,
}

/// Field set of the closed-loop `Data:` line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataFormat {
    /// `Data:<t>,<pos>,<ref>,<err>,<u>`
    Full,
    /// `Data:<t>,<pos>,<ref>`
    Short,
}

pub struct Telemetry<W: Write> {
    out: W,
    verbosity: Verbosity,
}

impl<W: Write> Telemetry<W> {
    pub fn new(out: W, verbosity: Verbosity) -> Self {
        Self { out, verbosity }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_str("\r\n");
    }

    /// `TASK:<id>`
    pub fn banner(&mut self, task_id: &str) {
        self.line(format_args!("TASK:{}", task_id));
    }

    pub fn position(&mut self, sample: &PositionSample, format: DataFormat) {
        let t = Seconds(sample.time_ms);
        match format {
            DataFormat::Full => self.line(format_args!(
                "Data:{},{:.2},{:.2},{:.2},{:.2}",
                t, sample.position_deg, sample.reference_deg, sample.error_deg, sample.control
            )),
            DataFormat::Short => self.line(format_args!(
                "Data:{},{:.2},{:.2}",
                t, sample.position_deg, sample.reference_deg
            )),
        }
    }

    /// `Data:<duty>,<t>,<velocity>` for open-loop runs.
    pub fn velocity(&mut self, duty: u16, time_ms: u32, deg_per_s: f32) {
        self.line(format_args!(
            "Data:{},{},{:.2}",
            duty,
            Seconds(time_ms),
            deg_per_s
        ));
    }

    /// `Tau:<duty>,<t>,<tau>` followed by a diagnostic summary of the run.
    pub fn tau(&mut self, tau: &TauMeasurement, rise_fraction: f32) {
        self.line(format_args!(
            "Tau:{},{},{:.3}",
            tau.duty,
            Seconds(tau.time_ms),
            tau.tau_s
        ));
        self.info(format_args!(
            "  [Start: {:.1} -> Steady: {:.1} -> {:.1}% at {:.1} deg/s]",
            tau.start_velocity,
            tau.steady_state_velocity,
            rise_fraction * 100.0,
            tau.threshold
        ));
    }

    pub fn zeroed(&mut self) {
        self.line(format_args!("ZEROED"));
    }

    /// Diagnostic line, dropped at [`Verbosity::Quiet`].
    pub fn info(&mut self, args: fmt::Arguments<'_>) {
        if self.verbosity == Verbosity::Normal {
            self.line(args);
        }
    }
}
