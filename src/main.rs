// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Firmware entry point.
//!
//! On the board this wires the peripherals into a [`Scheduler`](motorlab::scheduler::Scheduler)
//! and polls it forever. On the host the same scheduler drives a simulated motor and prints the
//! serial stream to stdout:
//!
//! ```bash
//! cargo run -- identification
//! cargo run -- position
//! ```
//!
//! The board image runs position control unless a `task-*` feature picks another task:
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf --features task-identification
//! ```

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod board {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use hal::{
        pac,
        prelude::*,
        serial::{Config as SerialConfig, Serial},
    };
    use stm32f7xx_hal as hal;

    use motorlab::config::{self, Config};
    use motorlab::drivers::HBridge;
    #[cfg(feature = "slit-encoder")]
    use motorlab::drivers::SlitEncoder;
    #[cfg(not(feature = "slit-encoder"))]
    use motorlab::hw::Encoder;
    use motorlab::hw::{BoardPins, Millis, Pwm, Usart};
    use motorlab::motors::DcMotor;
    use motorlab::scheduler::Scheduler;

    const PWM_HZ: u32 = 1_000;

    #[entry]
    fn main() -> ! {
        // Peripherals
        let dp = pac::Peripherals::take().unwrap();
        let cp = cortex_m::Peripherals::take().unwrap();

        // Clocks
        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.freeze();

        let pins = BoardPins::new(dp.GPIOA, dp.GPIOD, dp.GPIOE);

        // USART3 (ST-LINK VCP)
        let usart_cfg = SerialConfig {
            baud_rate: 115_200.bps(),
            ..Default::default()
        };
        let serial = Serial::new(
            dp.USART3,
            (pins.usart3.tx, pins.usart3.rx),
            &clocks,
            usart_cfg,
        );
        let (usart, mut rx) = Usart::new(serial);

        let millis = Millis::start(cp.SYST, clocks.sysclk().raw());

        // H-bridge: ENA on TIM4_CH1, IN1/IN2 plain GPIO
        let pwm = Pwm::tim4(dp.TIM4, clocks.timclk1().raw(), PWM_HZ);
        let bridge = HBridge::new(pwm, pins.bridge.in1, pins.bridge.in2, config::PWM_MAX);

        #[cfg(not(feature = "slit-encoder"))]
        let (sensor, counts_per_rev) = (
            Encoder::tim2(dp.TIM2),
            config::QUADRATURE_COUNTS_PER_REV,
        );
        #[cfg(feature = "slit-encoder")]
        let (sensor, counts_per_rev) = (SlitEncoder::new(pins.slit), config::SLIT_COUNTS_PER_REV);

        let mut motor = DcMotor::new(sensor, bridge);
        let config = Config::for_task(config::BUILD_TASK).with_counts_per_rev(counts_per_rev);
        let mut scheduler = Scheduler::new(&config, usart);

        // Give the host time to open the port
        millis.delay_ms(config::STARTUP_DELAY_MS);
        scheduler.start(millis.now(), &mut motor);

        loop {
            scheduler.poll(millis.now(), &mut motor, &mut rx);
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    host::run();
}

#[cfg(not(target_os = "none"))]
mod host {
    use std::collections::VecDeque;
    use std::io::Write as _;

    use motorlab::config::{self, Config, Task};
    use motorlab::motors::sim_motor::{SimMotor, DEFAULT_GAIN, DEFAULT_TAU_S};
    use motorlab::protocol::ByteSource;
    use motorlab::scheduler::Scheduler;

    /// stdout as a telemetry sink.
    struct Console(std::io::Stdout);

    impl core::fmt::Write for Console {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.write_all(s.as_bytes()).map_err(|_| core::fmt::Error)
        }
    }

    /// Command lines released to the scheduler at fixed simulated times.
    struct Script {
        pending: VecDeque<(u32, &'static str)>,
        bytes: VecDeque<u8>,
    }

    impl Script {
        fn new(lines: &[(u32, &'static str)]) -> Self {
            Self {
                pending: lines.iter().copied().collect(),
                bytes: VecDeque::new(),
            }
        }

        fn advance(&mut self, now_ms: u32) {
            while let Some(&(at_ms, line)) = self.pending.front() {
                if at_ms > now_ms {
                    break;
                }
                self.bytes.extend(line.bytes());
                self.bytes.push_back(b'\n');
                self.pending.pop_front();
            }
        }
    }

    impl ByteSource for Script {
        type Error = core::convert::Infallible;

        fn read_byte(&mut self) -> nb::Result<u8, Self::Error> {
            self.bytes.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    const NO_COMMANDS: &[(u32, &str)] = &[];
    const TUNING_SCRIPT: &[(u32, &str)] = &[(0, "G:2,0,0"), (100, "R:90"), (2_000, "R:-45")];
    const POSITION_SCRIPT: &[(u32, &str)] = &[
        (2_000, "R:90"),
        (3_000, "G:3,0.5,0.2"),
        (4_500, "Z"),
        (5_000, "S"),
    ];

    pub fn run() {
        let arg = std::env::args().nth(1).unwrap_or_default();
        let (task, duration_ms, script) = match arg.as_str() {
            "identification" => (Task::Identification, 40_000, NO_COMMANDS),
            "step" => (
                Task::StepResponse {
                    duty: config::STEP_RESPONSE_DUTY,
                },
                3_000,
                NO_COMMANDS,
            ),
            "tuning" => (Task::Tuning, 4_000, TUNING_SCRIPT),
            "stop" => (Task::Stop, 1_000, NO_COMMANDS),
            _ => (Task::Position, 6_000, POSITION_SCRIPT),
        };

        let config = Config::for_task(task);
        let mut motor = SimMotor::new(DEFAULT_TAU_S, DEFAULT_GAIN, config.counts_per_rev);
        let mut input = Script::new(script);
        let mut scheduler = Scheduler::new(&config, Console(std::io::stdout()));

        scheduler.start(0, &mut motor);
        for now_ms in 1..=duration_ms {
            motor.advance(0.001);
            input.advance(now_ms);
            scheduler.poll(now_ms, &mut motor, &mut input);
        }
    }
}
