//! Real `StatusLed` and `Buzzer` drivers on mock peripherals, with real
//! (thread-sleep) timing.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use checkin_node::app::events::AppEvent;
use checkin_node::app::ports::{LightDevice, RandomColorMode, SoundDevice};
use checkin_node::app::service::FeedbackService;
use checkin_node::config::NodeConfig;
use checkin_node::drivers::buzzer::Buzzer;
use checkin_node::drivers::delay::ThreadDelay;
use checkin_node::drivers::status_led::{CycleSettings, RgbChannels, StatusLed};
use checkin_node::fsm::patterns::Rgb;
use checkin_node::fsm::{FsmContext, SystemState};

use super::mock_hw::{EventLog, MockPin, MockPwm, RecordingSink};

type Led = StatusLed<MockPwm, MockPwm, MockPwm, ThreadDelay>;

fn led(cycle: CycleSettings) -> (Led, [MockPwm; 3]) {
    let pwm = [MockPwm::default(), MockPwm::default(), MockPwm::default()];
    let channels = RgbChannels::new(pwm[0].clone(), pwm[1].clone(), pwm[2].clone(), false);
    (StatusLed::new(channels, ThreadDelay, cycle), pwm)
}

fn duties(pwm: &[MockPwm; 3]) -> [u16; 3] {
    [pwm[0].duty(), pwm[1].duty(), pwm[2].duty()]
}

fn fast_cycle() -> CycleSettings {
    CycleSettings {
        steps: 5,
        transition: Duration::from_millis(25),
        stop_timeout: Duration::from_millis(500),
    }
}

#[test]
fn pattern_four_by_point_one_takes_about_point_eight_seconds() {
    let pin = MockPin::new();
    let mut buzzer = Buzzer::new(pin.clone(), ThreadDelay);

    let t0 = Instant::now();
    buzzer.pattern(4, 0.1).unwrap();
    let elapsed = t0.elapsed();

    assert_eq!(pin.levels(), [true, false].repeat(4));
    assert!(elapsed >= Duration::from_millis(800), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
}

#[test]
fn color_maps_to_duty() {
    let (mut led, pwm) = led(fast_cycle());
    led.set_color(Rgb::new(0.5, 0.2, 1.5)).unwrap();
    assert_eq!(duties(&pwm), [500, 200, 1000]);
    assert_eq!(led.current_color(), Rgb::new(0.5, 0.2, 1.0));
}

#[test]
fn common_anode_inverts_duty() {
    let pwm = [MockPwm::default(), MockPwm::default(), MockPwm::default()];
    let channels = RgbChannels::new(pwm[0].clone(), pwm[1].clone(), pwm[2].clone(), true);
    let mut led = StatusLed::new(channels, ThreadDelay, fast_cycle());
    led.set_color(Rgb::new(1.0, 0.25, 0.0)).unwrap();
    assert_eq!(duties(&pwm), [0, 750, 1000]);
}

#[test]
fn random_mode_runs_until_a_color_arrives() {
    let (mut led, pwm) = led(fast_cycle());

    assert!(led.start_random().unwrap());
    assert!(!led.start_random().unwrap(), "second start must not spawn");
    assert!(led.random_active());

    std::thread::sleep(Duration::from_millis(100));
    led.set_color(Rgb::GREEN).unwrap();
    assert!(!led.random_active());
    assert_eq!(duties(&pwm), [0, 1000, 0]);

    // Nothing touches the channels once cycling has stopped.
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(duties(&pwm), [0, 1000, 0]);
}

#[test]
fn stop_random_reports_whether_it_ran() {
    let (mut led, _pwm) = led(fast_cycle());
    assert!(!led.stop_random());
    led.start_random().unwrap();
    assert!(led.stop_random());
    assert!(!led.stop_random());
}

#[test]
fn dropping_the_drivers_switches_everything_off() {
    let (mut led, pwm) = led(fast_cycle());
    led.set_color(Rgb::YELLOW).unwrap();
    drop(led);
    assert_eq!(duties(&pwm), [0, 0, 0]);

    let pin = MockPin::new();
    let mut buzzer = Buzzer::new(pin.clone(), ThreadDelay);
    buzzer.beep(0.01).unwrap();
    drop(buzzer);
    assert_eq!(pin.levels().last(), Some(&false));
}

#[test]
fn success_light_and_sound_run_concurrently() {
    let (led, pwm) = led(fast_cycle());
    let pin = MockPin::new();
    let ctx = FsmContext::new(led, Buzzer::new(pin.clone(), ThreadDelay), ThreadDelay, false);
    let svc = FeedbackService::new(ctx, RecordingSink::default(), &NodeConfig::default());
    svc.start().unwrap();

    let t0 = Instant::now();
    svc.route("checkin/state", "SUCCESS").unwrap();
    let elapsed = t0.elapsed();

    // Light (0.4 s) and pattern (2 × 0.4 s) overlap: well under their sum.
    assert!(elapsed >= Duration::from_millis(800), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1150), "took {elapsed:?}");
    assert_eq!(svc.state(), SystemState::Idle);
    assert_eq!(duties(&pwm), [0, 0, 1000]);
    assert_eq!(pin.levels(), [true, false].repeat(2));
}

#[test]
fn shutdown_stops_random_mode_and_switches_everything_off() {
    let (led, pwm) = led(fast_cycle());
    let pin = MockPin::new();
    let events = EventLog::default();
    let ctx = FsmContext::new(led, Buzzer::new(pin.clone(), ThreadDelay), ThreadDelay, false);
    let svc = FeedbackService::new(ctx, RecordingSink(events.clone()), &NodeConfig::default());
    svc.start().unwrap();

    svc.route("checkin/rgb", "random").unwrap();
    std::thread::sleep(Duration::from_millis(60));
    svc.shutdown();

    assert_eq!(duties(&pwm), [0, 0, 0]);
    assert_eq!(pin.levels(), [false]);
    assert_eq!(events.lock().unwrap().last(), Some(&AppEvent::ShuttingDown));

    // The cycling task is gone: nothing relights the LED.
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(duties(&pwm), [0, 0, 0]);
}

/// Every step stalls far longer than the stop timeout allows.
#[derive(Clone, Copy)]
struct Stall;

impl DelayNs for Stall {
    fn delay_ns(&mut self, _ns: u32) {
        std::thread::sleep(Duration::from_millis(800));
    }

    fn delay_us(&mut self, _us: u32) {
        std::thread::sleep(Duration::from_millis(800));
    }
}

#[test]
fn stuck_cycling_task_is_detached_after_the_stop_timeout() {
    let pwm = [MockPwm::default(), MockPwm::default(), MockPwm::default()];
    let channels = RgbChannels::new(pwm[0].clone(), pwm[1].clone(), pwm[2].clone(), false);
    let cycle = CycleSettings {
        stop_timeout: Duration::from_millis(50),
        ..fast_cycle()
    };
    let mut led = StatusLed::new(channels, Stall, cycle);

    led.start_random().unwrap();
    // Let the task write its first step and fall into the stall.
    std::thread::sleep(Duration::from_millis(20));

    let t0 = Instant::now();
    led.set_color(Rgb::BLUE).unwrap();
    let elapsed = t0.elapsed();

    assert!(elapsed >= Duration::from_millis(50), "took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");
    assert!(!led.random_active());
    assert_eq!(duties(&pwm), [0, 0, 1000]);

    // The detached task wakes up, sees the cleared flag and never writes.
    std::thread::sleep(Duration::from_secs(1));
    assert_eq!(duties(&pwm), [0, 0, 1000]);
}
