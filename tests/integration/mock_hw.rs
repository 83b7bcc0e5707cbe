//! Mock hardware for integration tests.
//!
//! Two layers of doubles:
//! - `MockLight` / `MockSound` record every port call, so tests can assert
//!   on the full device history without timing.
//! - `MockPwm` / `MockPin` stand in for the raw peripherals underneath the
//!   real `StatusLed` and `Buzzer` drivers, with timestamps.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use checkin_node::app::events::AppEvent;
use checkin_node::app::ports::{EventSink, LightDevice, RandomColorMode, SoundDevice};
use checkin_node::app::service::FeedbackService;
use checkin_node::config::NodeConfig;
use checkin_node::error::{DeviceError, Result};
use checkin_node::fsm::FsmContext;
use checkin_node::fsm::patterns::Rgb;

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Color(Rgb),
    Beep(f32),
    Pattern(u32, f32),
    RandomStart,
    RandomStop,
}

pub type CallLog = Arc<Mutex<Vec<HwCall>>>;

pub fn calls(log: &CallLog) -> Vec<HwCall> {
    log.lock().unwrap().clone()
}

// ── MockLight ─────────────────────────────────────────────────

pub struct MockLight {
    log: CallLog,
    random: bool,
    /// Fail every write from now on.
    pub broken: bool,
}

impl LightDevice for MockLight {
    fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.stop_random();
        if self.broken {
            return Err(DeviceError::PwmWrite.into());
        }
        self.log.lock().unwrap().push(HwCall::Color(color.clamped()));
        Ok(())
    }
}

impl RandomColorMode for MockLight {
    fn start_random(&mut self) -> Result<bool> {
        if self.random {
            return Ok(false);
        }
        self.random = true;
        self.log.lock().unwrap().push(HwCall::RandomStart);
        Ok(true)
    }

    fn stop_random(&mut self) -> bool {
        if !self.random {
            return false;
        }
        self.random = false;
        self.log.lock().unwrap().push(HwCall::RandomStop);
        true
    }

    fn random_active(&self) -> bool {
        self.random
    }
}

// ── MockSound ─────────────────────────────────────────────────

pub struct MockSound {
    log: CallLog,
}

impl SoundDevice for MockSound {
    fn beep(&mut self, secs: f32) -> Result<()> {
        self.log.lock().unwrap().push(HwCall::Beep(secs));
        Ok(())
    }

    fn pattern(&mut self, count: u32, interval_secs: f32) -> Result<()> {
        self.log.lock().unwrap().push(HwCall::Pattern(count, interval_secs));
        Ok(())
    }
}

/// Holds return immediately so sequences run at full speed.
#[derive(Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Event sink ────────────────────────────────────────────────

pub type EventLog = Arc<Mutex<Vec<AppEvent>>>;

#[derive(Default)]
pub struct RecordingSink(pub EventLog);

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Rigs ──────────────────────────────────────────────────────

pub type MockService = FeedbackService<MockLight, MockSound, NoDelay, RecordingSink>;

pub fn mock_context(log: &CallLog, error_requires_reset: bool) -> FsmContext<MockLight, MockSound, NoDelay> {
    FsmContext::new(
        MockLight {
            log: log.clone(),
            random: false,
            broken: false,
        },
        MockSound { log: log.clone() },
        NoDelay,
        error_requires_reset,
    )
}

/// A started service over recording mocks; both logs are cleared after
/// the boot feedback.
pub fn service(config: &NodeConfig) -> (MockService, CallLog, EventLog) {
    let log = CallLog::default();
    let events = EventLog::default();
    let svc = FeedbackService::new(
        mock_context(&log, config.error_requires_reset),
        RecordingSink(events.clone()),
        config,
    );
    svc.start().unwrap();
    log.lock().unwrap().clear();
    events.lock().unwrap().clear();
    (svc, log, events)
}

// ── Raw peripheral doubles ────────────────────────────────────

/// PWM channel whose duty can be read back.
#[derive(Clone, Default)]
pub struct MockPwm(pub Arc<Mutex<u16>>);

impl MockPwm {
    pub fn duty(&self) -> u16 {
        *self.0.lock().unwrap()
    }
}

impl embedded_hal::pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Infallible> {
        *self.0.lock().unwrap() = duty;
        Ok(())
    }
}

/// Output pin that timestamps every level change.
#[derive(Clone)]
pub struct MockPin(pub Arc<Mutex<Vec<(Instant, bool)>>>);

impl MockPin {
    pub fn new() -> Self {
        Self(Arc::default())
    }

    pub fn levels(&self) -> Vec<bool> {
        self.0.lock().unwrap().iter().map(|(_, level)| *level).collect()
    }

    /// Time from the first edge to the last.
    pub fn span(&self) -> std::time::Duration {
        let edges = self.0.lock().unwrap();
        match (edges.first(), edges.last()) {
            (Some((first, _)), Some((last, _))) => last.duration_since(*first),
            _ => std::time::Duration::ZERO,
        }
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.0.lock().unwrap().push((Instant::now(), false));
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.0.lock().unwrap().push((Instant::now(), true));
        Ok(())
    }
}
