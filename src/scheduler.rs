// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Cooperative control loop.
//!
//! [`Scheduler::poll`] is called as often as possible from the main loop with the current time.
//! Each call runs, in this order:
//!
//! 1. sensor polling,
//! 2. command ingestion (every complete line is applied before anything else reads the state),
//! 3. the identification timer, if that task is active,
//! 4. the control tick (PID → drive mapping → actuator), when its period has elapsed,
//! 5. the sampling tick (angle/velocity estimation, open-loop telemetry), when its period has
//!    elapsed.
//!
//! Nothing in here blocks. All controller state lives in one [`Controller`] owned by the scheduler.

use core::fmt::Write;

use crate::config::{Config, Task};
use crate::control::identification::{Effect, Effects, Event, IdentificationStateMachine};
use crate::control::{ActuatorCommand, AngleEstimator, Direction, DriveMapper, Pid};
use crate::motors::{Actuator, RotationSensor};
use crate::protocol::{ByteSource, Command, ParseError, Parser};
use crate::telemetry::{DataFormat, PositionSample, Telemetry};

/// Fixed-period timer on a wrapping millisecond clock.
#[derive(Copy, Clone, Debug)]
pub struct Interval {
    period_ms: u32,
    last_ms: u32,
}

impl Interval {
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: 0,
        }
    }

    #[inline]
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Start measuring from `now_ms`.
    #[inline]
    pub fn restart(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
    }

    /// If at least one period has passed, rearm and return the measured elapsed time.
    pub fn due(&mut self, now_ms: u32) -> Option<u32> {
        let elapsed = now_ms.wrapping_sub(self.last_ms);
        if elapsed >= self.period_ms {
            self.last_ms = now_ms;
            Some(elapsed)
        } else {
            None
        }
    }
}

/// All mutable control state of the firmware.
pub struct Controller {
    task: Task,
    estimator: AngleEstimator,
    pid: Pid,
    mapper: DriveMapper,
    identification: IdentificationStateMachine,
    rise_fraction: f32,

    reference: f32,
    position: f32,
    velocity: f32,
    /// Set once the step-response task has applied its step.
    step_applied: bool,
}

impl Controller {
    pub fn new(config: &Config) -> Self {
        let pid = Pid::new(config.gains)
            .with_integral_limits(config.integral_min, config.integral_max)
            .with_derivative_filter(config.derivative_alpha)
            .with_shortest_path(config.task != Task::Tuning);

        Self {
            task: config.task,
            estimator: AngleEstimator::new(config.counts_per_rev).with_min_dt(config.min_dt_s),
            pid,
            mapper: DriveMapper::new(config.pwm_max, config.deadzone),
            identification: IdentificationStateMachine::new(config.identification.clone()),
            rise_fraction: config.identification.rise_fraction,
            reference: config.initial_reference,
            position: 0.0,
            velocity: 0.0,
            step_applied: false,
        }
    }

    #[inline]
    pub fn task(&self) -> Task {
        self.task
    }

    #[inline]
    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// Angle used by the most recent control tick (deg).
    #[inline]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Most recent velocity estimate (deg/s).
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    #[inline]
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    #[inline]
    pub fn estimator(&self) -> &AngleEstimator {
        &self.estimator
    }

    #[inline]
    pub fn identification(&self) -> &IdentificationStateMachine {
        &self.identification
    }

    /// Angle fed to the controller for a raw count.
    fn measure(&self, count: i32) -> f32 {
        match self.task {
            Task::Tuning => self.estimator.continuous_angle(count),
            _ => self.estimator.angle(count),
        }
    }
}

pub struct Scheduler<W: Write> {
    controller: Controller,
    parser: Parser,
    control_tick: Interval,
    sample_tick: Interval,
    telemetry: Telemetry<W>,
}

impl<W: Write> Scheduler<W> {
    pub fn new(config: &Config, sink: W) -> Self {
        Self {
            controller: Controller::new(config),
            parser: Parser::new(),
            control_tick: Interval::new(config.control_period_ms),
            sample_tick: Interval::new(config.sample_period_ms),
            telemetry: Telemetry::new(sink, config.verbosity),
        }
    }

    #[inline]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[inline]
    pub fn telemetry(&self) -> &Telemetry<W> {
        &self.telemetry
    }

    #[inline]
    pub fn telemetry_mut(&mut self) -> &mut Telemetry<W> {
        &mut self.telemetry
    }

    /// Stop and zero the motor, print the banner and arm both timers at `now_ms`.
    pub fn start<M>(&mut self, now_ms: u32, motor: &mut M)
    where
        M: RotationSensor + Actuator,
    {
        motor.apply(ActuatorCommand::STOP);
        motor.zero();
        self.controller.estimator.reset();

        if let Some(id) = self.controller.task.banner_id() {
            self.telemetry.banner(id);
        }

        match self.controller.task {
            Task::Identification => {
                self.telemetry
                    .info(format_args!("Starting automatic duty cycle test..."));
            }
            Task::Position => {
                let gains = self.controller.pid.gains();
                self.telemetry
                    .info(format_args!("PID Position Controller Started"));
                self.telemetry
                    .info(format_args!("Commands: R:<deg>  G:<Kp>,<Ki>,<Kd>  S  Z"));
                self.telemetry.info(format_args!(
                    "Initial reference: {:.2} deg",
                    self.controller.reference
                ));
                self.telemetry.info(format_args!(
                    "PID gains: Kp={:.3}, Ki={:.3}, Kd={:.3}",
                    gains.kp, gains.ki, gains.kd
                ));
            }
            _ => {}
        }

        self.control_tick.restart(now_ms);
        self.sample_tick.restart(now_ms);
    }

    /// Run one scheduler iteration at `now_ms`.
    pub fn poll<M, S>(&mut self, now_ms: u32, motor: &mut M, source: &mut S)
    where
        M: RotationSensor + Actuator,
        S: ByteSource,
    {
        motor.poll();

        let Self {
            controller,
            parser,
            telemetry,
            ..
        } = self;
        parser.drain(source, |line| {
            handle_line(controller, telemetry, &mut *motor, line)
        });

        if self.controller.task == Task::Identification {
            let effects = self
                .controller
                .identification
                .step(Event::Tick { now_ms });
            self.apply_effects(effects, motor);
        }

        if let Some(elapsed_ms) = self.control_tick.due(now_ms) {
            if self.controller.task.is_closed_loop() {
                self.control(now_ms, elapsed_ms, motor);
            }
        }

        if self.sample_tick.due(now_ms).is_some() {
            self.sample(now_ms, motor);
        }
    }

    fn control<M>(&mut self, now_ms: u32, elapsed_ms: u32, motor: &mut M)
    where
        M: RotationSensor + Actuator,
    {
        let c = &mut self.controller;
        let dt = elapsed_ms as f32 / 1000.0;

        c.position = c.measure(motor.count());
        let control = c.pid.update(c.reference, c.position, dt);
        motor.apply(c.mapper.map(control));

        let format = match c.task {
            Task::Tuning => DataFormat::Short,
            _ => DataFormat::Full,
        };
        let sample = PositionSample {
            time_ms: now_ms,
            position_deg: c.position,
            reference_deg: c.reference,
            error_deg: c.pid.last_error(),
            control,
        };
        self.telemetry.position(&sample, format);
    }

    fn sample<M>(&mut self, now_ms: u32, motor: &mut M)
    where
        M: RotationSensor + Actuator,
    {
        let velocity = self.controller.estimator.sample(motor.count(), now_ms);
        if let Some(v) = velocity {
            self.controller.velocity = v;
        }

        match (self.controller.task, velocity) {
            (Task::Identification, Some(v)) => {
                let effects = self.controller.identification.step(Event::Velocity {
                    now_ms,
                    deg_per_s: v,
                });
                self.apply_effects(effects, motor);
                let duty = self.controller.identification.active_duty();
                self.telemetry.velocity(duty, now_ms, v);
            }
            (Task::StepResponse { duty }, None) if !self.controller.step_applied => {
                motor.apply(ActuatorCommand::new(Direction::Forward, duty));
                self.controller.step_applied = true;
            }
            (Task::StepResponse { duty }, Some(v)) => self.telemetry.velocity(duty, now_ms, v),
            _ => {}
        }
    }

    fn apply_effects<M: Actuator>(&mut self, effects: Effects, motor: &mut M) {
        for effect in effects {
            match effect {
                Effect::RunStarted { index, total, duty } => self.telemetry.info(format_args!(
                    "Test {}/{}: d={}",
                    index + 1,
                    total,
                    duty
                )),
                Effect::Drive(cmd) => motor.apply(cmd),
                Effect::SteadyReached => self
                    .telemetry
                    .info(format_args!("  Steady state reached. Stopping motor...")),
                Effect::Stopped => self.telemetry.info(format_args!("  Motor stopped.")),
                Effect::Tau(tau) => self.telemetry.tau(&tau, self.controller.rise_fraction),
                Effect::CycleComplete => self
                    .telemetry
                    .info(format_args!("All tests complete. Restarting cycle...")),
            }
        }
    }
}

/// Apply one received line. Malformed lines are reported at most and never change state.
fn handle_line<W, M>(
    c: &mut Controller,
    telemetry: &mut Telemetry<W>,
    motor: &mut M,
    line: Result<Command, ParseError>,
) where
    W: Write,
    M: RotationSensor + Actuator,
{
    match line {
        Ok(Command::SetReference(reference)) => {
            c.reference = reference;
            c.pid.reset_integral();
            telemetry.info(format_args!("Reference set to: {:.2} deg", reference));
        }
        Ok(Command::SetGains(gains)) => {
            c.pid.set_gains(gains);
            telemetry.info(format_args!(
                "Gains updated: Kp={:.3}, Ki={:.3}, Kd={:.3}",
                gains.kp, gains.ki, gains.kd
            ));
        }
        Ok(Command::Stop) => {
            motor.apply(ActuatorCommand::STOP);
            c.pid.reset_integral();
            telemetry.info(format_args!("Motor stopped"));
        }
        Ok(Command::Zero) => {
            motor.zero();
            c.estimator.reset();
            c.position = 0.0;
            c.reference = 0.0;
            c.pid.reset_integral();
            telemetry.zeroed();
        }
        Err(ParseError::Empty) => {}
        Err(ParseError::MissingSeparator | ParseError::InvalidGain) => telemetry.info(
            format_args!("Error: Invalid gain format. Use G:<Kp>,<Ki>,<Kd>"),
        ),
        Err(ParseError::InvalidNumber) => {
            telemetry.info(format_args!("Error: Invalid reference. Use R:<deg>"))
        }
        Err(ParseError::Overflow) => telemetry.info(format_args!("Error: Line too long")),
        Err(ParseError::Unknown | ParseError::InvalidUtf8) => {
            telemetry.info(format_args!("Unknown command"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentificationConfig;
    use crate::control::Gains;
    use crate::motors::SimMotor;
    use crate::telemetry::Verbosity;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    /// Serial input fed by the test.
    #[derive(Default)]
    struct Input(VecDeque<u8>);

    impl Input {
        fn send(&mut self, line: &str) {
            self.0.extend(line.bytes());
        }
    }

    impl ByteSource for Input {
        type Error = ();

        fn read_byte(&mut self) -> nb::Result<u8, ()> {
            self.0.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    struct Bench {
        scheduler: Scheduler<String>,
        motor: SimMotor,
        input: Input,
        now_ms: u32,
    }

    impl Bench {
        fn new(config: Config) -> Self {
            let mut motor = SimMotor::new(0.1, 12.4, config.counts_per_rev);
            let mut scheduler = Scheduler::new(&config, String::new());
            scheduler.start(0, &mut motor);
            Self {
                scheduler,
                motor,
                input: Input::default(),
                now_ms: 0,
            }
        }

        /// Poll once per millisecond up to and including `until_ms`.
        fn run_until(&mut self, until_ms: u32) {
            while self.now_ms < until_ms {
                self.now_ms += 1;
                self.motor.advance(0.001);
                self.scheduler
                    .poll(self.now_ms, &mut self.motor, &mut self.input);
            }
        }

        fn output(&self) -> &str {
            self.scheduler.telemetry().get_ref()
        }

        fn lines(&self) -> Vec<&str> {
            self.output().split("\r\n").filter(|l| !l.is_empty()).collect()
        }
    }

    #[test]
    fn interval_fires_on_period_and_rearms() {
        let mut tick = Interval::new(10);
        tick.restart(5);
        assert_eq!(tick.due(14), None);
        assert_eq!(tick.due(15), Some(10));
        assert_eq!(tick.due(24), None);
        assert_eq!(tick.due(27), Some(12));
    }

    #[test]
    fn interval_survives_clock_rollover() {
        let mut tick = Interval::new(50);
        tick.restart(u32::MAX - 20);
        assert_eq!(tick.due(10), None);
        assert_eq!(tick.due(29), Some(50));
    }

    #[test]
    fn position_banner_and_first_data_line() {
        let mut bench = Bench::new(Config::for_task(Task::Position));
        bench.run_until(10);

        let lines = bench.lines();
        assert_eq!(lines[0], "TASK:2-1");
        assert!(lines.contains(&"Initial reference: 200.00 deg"));
        // 200° away from 0° is shorter the other way round
        let data = lines.iter().find(|l| l.starts_with("Data:")).unwrap();
        assert!(data.starts_with("Data:0.010,0.00,200.00,-160.00,"), "{data}");
    }

    #[test]
    fn reference_and_gain_commands_reset_integral() {
        let config = Config::for_task(Task::Position).with_gains(Gains::new(0.1, 1.0, 0.0));
        let mut bench = Bench::new(config);
        bench.run_until(200);
        assert!(bench.scheduler.controller().pid().integral() != 0.0);

        bench.input.send("R:90\n");
        bench.run_until(205);
        let c = bench.scheduler.controller();
        assert_eq!(c.reference(), 90.0);
        assert_eq!(c.pid().integral(), 0.0);

        // the next accumulation starts from zero
        bench.run_until(210);
        let pid = bench.scheduler.controller().pid();
        assert_relative_eq!(pid.integral(), pid.last_error() * 0.01, epsilon = 1e-4);

        bench.input.send("G:10.5,5.2,2.1\n");
        bench.run_until(215);
        let pid = bench.scheduler.controller().pid();
        assert_eq!(pid.gains(), Gains::new(10.5, 5.2, 2.1));
        assert_eq!(pid.integral(), 0.0);
        assert!(bench
            .output()
            .contains("Gains updated: Kp=10.500, Ki=5.200, Kd=2.100\r\n"));
    }

    #[test]
    fn stop_takes_effect_before_the_next_tick() {
        let config = Config::for_task(Task::Position).with_gains(Gains::new(1.0, 0.0, 0.0));
        let mut bench = Bench::new(config);
        bench.run_until(50);
        assert!(bench.motor.drive() != 0.0);

        bench.input.send("S\n");
        bench.run_until(51);
        assert_eq!(bench.motor.drive(), 0.0);
        assert_eq!(bench.scheduler.controller().pid().integral(), 0.0);
        assert!(bench.output().contains("Motor stopped\r\n"));
    }

    #[test]
    fn zero_resets_frame_and_acknowledges() {
        let config = Config::for_task(Task::Position).with_gains(Gains::new(1.0, 0.0, 0.0));
        let mut bench = Bench::new(config);
        bench.run_until(300);
        assert!(bench.motor.count() != 0);

        bench.input.send("Z\n");
        bench.run_until(301);
        let c = bench.scheduler.controller();
        assert_eq!(c.reference(), 0.0);
        assert_eq!(c.pid().integral(), 0.0);
        assert!(!c.estimator().is_primed());
        assert_eq!(bench.motor.count(), 0);
        assert!(bench.lines().contains(&"ZEROED"));
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let mut bench = Bench::new(Config::for_task(Task::Position));
        bench.input.send("G:1,2\nhello\n\n");
        bench.run_until(1);

        let c = bench.scheduler.controller();
        assert_eq!(c.pid().gains(), crate::config::POSITION_GAINS);
        assert_eq!(c.reference(), 200.0);
        let lines = bench.lines();
        assert!(lines.contains(&"Error: Invalid gain format. Use G:<Kp>,<Ki>,<Kd>"));
        assert!(lines.contains(&"Unknown command"));
    }

    #[test]
    fn rejected_lines_name_the_problem() {
        let mut bench = Bench::new(Config::for_task(Task::Position));
        bench.input.send("G:1,x,3\nR:north\n");
        bench.input.send(&"9".repeat(80));
        bench.input.send("\n");
        bench.run_until(1);

        let c = bench.scheduler.controller();
        assert_eq!(c.pid().gains(), crate::config::POSITION_GAINS);
        assert_eq!(c.reference(), 200.0);
        let lines = bench.lines();
        assert!(lines.contains(&"Error: Invalid gain format. Use G:<Kp>,<Ki>,<Kd>"));
        assert!(lines.contains(&"Error: Invalid reference. Use R:<deg>"));
        assert!(lines.contains(&"Error: Line too long"));
        assert!(!lines.contains(&"Unknown command"));
    }

    #[test]
    fn tuning_emits_protocol_lines_only() {
        let mut bench = Bench::new(Config::for_task(Task::Tuning));
        bench.input.send("R:30\nG:2,0,0\n");
        bench.run_until(50);

        let lines = bench.lines();
        assert_eq!(lines[0], "TASK:KP_TUNING");
        assert!(lines[1..].iter().all(|l| l.starts_with("Data:")));
        assert_eq!(lines[1], "Data:0.010,0.00,30.00");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn tuning_tracks_the_continuous_angle() {
        let config = Config::for_task(Task::Tuning).with_gains(Gains::new(2.0, 0.0, 0.0));
        let mut bench = Bench::new(config);
        bench.input.send("R:400\n");
        let mut furthest = 0.0f32;
        for t in (10..=300).step_by(10) {
            bench.run_until(t);
            furthest = furthest.max(bench.scheduler.controller().position());
        }
        // beyond one revolution without wrapping back
        assert!(furthest > 360.0, "{furthest}");
    }

    #[test]
    fn step_response_starts_on_first_sample() {
        let mut bench = Bench::new(Config::for_task(Task::StepResponse { duty: 200 }));
        bench.run_until(49);
        assert_eq!(bench.motor.drive(), 0.0);
        bench.run_until(50);
        assert_eq!(bench.motor.drive(), 200.0);

        bench.run_until(100);
        let lines = bench.lines();
        assert_eq!(lines[0], "TASK:1-1");
        assert!(lines[1].starts_with("Data:200,0.100,"), "{}", lines[1]);
    }

    #[test]
    fn stop_task_is_silent() {
        let mut bench = Bench::new(Config::for_task(Task::Stop));
        bench.run_until(500);
        assert_eq!(bench.output(), "");
        assert_eq!(bench.motor.drive(), 0.0);
    }

    #[test]
    fn identification_sweep_measures_each_level_and_repeats() {
        let ident = IdentificationConfig::default()
            .with_duties(&[150, 200])
            .with_timings(1000, 500, 500, 500);
        let config = Config::for_task(Task::Identification)
            .with_counts_per_rev(3600.0)
            .with_identification(ident);
        let mut bench = Bench::new(config);
        bench.run_until(3600);

        let out = bench.output();
        let lines = bench.lines();
        assert_eq!(lines[0], "TASK:1-2");
        assert_eq!(lines.iter().filter(|l| **l == "Test 1/2: d=150").count(), 2);
        assert_eq!(lines.iter().filter(|l| **l == "Test 2/2: d=200").count(), 1);
        assert!(out.contains("All tests complete. Restarting cycle..."));

        // runs start on the first poll (1 ms) and at 1502 ms; the first sample after the settle
        // delay seeds the average and latches
        assert!(out.contains("Tau:150,0.550,0.549\r\n"), "{out}");
        assert!(out.contains("Tau:200,2.050,0.548\r\n"), "{out}");
        assert_eq!(lines.iter().filter(|l| l.starts_with("Tau:")).count(), 2);

        assert!(out.contains("Data:150,0.100,"));
        assert!(out.contains("  Steady state reached. Stopping motor..."));
    }

    #[test]
    fn identification_reports_zero_duty_once_stopped() {
        let ident = IdentificationConfig::default()
            .with_duties(&[150])
            .with_timings(1000, 500, 500, 500);
        let config = Config::for_task(Task::Identification).with_identification(ident);
        let mut bench = Bench::new(config);
        bench.run_until(1250);

        let out = bench.output();
        assert!(out.contains("Data:150,1.000,"), "{out}");
        // dwell ends at 1001 ms
        assert!(out.contains("Data:0,1.050,"), "{out}");
        assert!(out.contains("Data:0,1.200,"), "{out}");
        assert!(!out.contains("Data:150,1.050,"));
        assert_eq!(bench.motor.drive(), 0.0);
    }

    #[test]
    fn quiet_identification_keeps_tau_lines() {
        let ident = IdentificationConfig::default()
            .with_duties(&[150])
            .with_timings(1000, 500, 500, 500);
        let config = Config::for_task(Task::Identification)
            .with_verbosity(Verbosity::Quiet)
            .with_identification(ident);
        let mut bench = Bench::new(config);
        bench.run_until(1000);

        let lines = bench.lines();
        assert!(lines.iter().all(|l| l.starts_with("TASK:")
            || l.starts_with("Data:")
            || l.starts_with("Tau:")));
        assert_eq!(lines.iter().filter(|l| l.starts_with("Tau:150,")).count(), 1);
    }
}
