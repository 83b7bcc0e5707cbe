//! State machine driven through `FsmContext` with recording devices.

use checkin_node::error::{DeviceError, Error};
use checkin_node::fsm::patterns::Rgb;
use checkin_node::fsm::states::build_state_table;
use checkin_node::fsm::{FsmContext, StateMachine, SystemState};

use super::mock_hw::{CallLog, HwCall, MockLight, MockSound, NoDelay, calls, mock_context};

type Machine = StateMachine<FsmContext<MockLight, MockSound, NoDelay>>;

fn machine(error_requires_reset: bool) -> (Machine, CallLog) {
    let log = CallLog::default();
    let sm = StateMachine::new(build_state_table(), mock_context(&log, error_requires_reset));
    (sm, log)
}

fn take(log: &CallLog) -> Vec<HwCall> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[test]
fn boot_shows_blue_and_stays_idle() {
    let (mut sm, log) = machine(false);
    sm.start().unwrap();
    assert_eq!(sm.current_state(), SystemState::Idle);
    assert_eq!(sm.previous_state(), None);
    assert_eq!(calls(&log), vec![HwCall::Color(Rgb::BLUE)]);
}

#[test]
fn scanning_then_success_returns_to_idle() {
    let (mut sm, log) = machine(false);

    sm.transition_to(SystemState::Scanning).unwrap();
    assert_eq!(take(&log), vec![HwCall::Color(Rgb::YELLOW), HwCall::Beep(0.2)]);
    assert_eq!(sm.current_state(), SystemState::Scanning);

    sm.transition_to(SystemState::Success).unwrap();
    let played = take(&log);
    // Light and sound overlap, so only their relative order per device is fixed.
    let colors: Vec<_> = played
        .iter()
        .filter(|c| matches!(c, HwCall::Color(_)))
        .cloned()
        .collect();
    assert_eq!(
        colors,
        vec![
            HwCall::Color(Rgb::GREEN),
            HwCall::Color(Rgb::OFF),
            HwCall::Color(Rgb::GREEN),
            HwCall::Color(Rgb::BLUE),
        ]
    );
    assert!(played.contains(&HwCall::Pattern(2, 0.2)));
    assert_eq!(played.last(), Some(&HwCall::Color(Rgb::BLUE)));

    assert_eq!(sm.current_state(), SystemState::Idle);
    assert_eq!(sm.previous_state(), Some(SystemState::Success));
    assert_eq!(
        sm.drain_transitions().collect::<Vec<_>>(),
        vec![
            (SystemState::Idle, SystemState::Scanning),
            (SystemState::Scanning, SystemState::Success),
            (SystemState::Success, SystemState::Idle),
        ]
    );
}

#[test]
fn every_outcome_state_self_clears_by_default() {
    for outcome in [
        SystemState::Success,
        SystemState::Failure,
        SystemState::AlreadyScanned,
        SystemState::Error,
    ] {
        let (mut sm, _log) = machine(false);
        sm.transition_to(outcome).unwrap();
        assert_eq!(sm.current_state(), SystemState::Idle, "{outcome} did not clear");
        assert_eq!(sm.previous_state(), Some(outcome));
    }
}

#[test]
fn repeated_scanning_plays_once() {
    let (mut sm, log) = machine(false);
    sm.transition_to(SystemState::Scanning).unwrap();
    sm.transition_to(SystemState::Scanning).unwrap();
    assert_eq!(calls(&log), vec![HwCall::Color(Rgb::YELLOW), HwCall::Beep(0.2)]);
    assert_eq!(sm.previous_state(), Some(SystemState::Idle));
}

#[test]
fn failure_holds_red_with_long_beep() {
    let (mut sm, log) = machine(false);
    sm.transition_to(SystemState::Failure).unwrap();
    let played = calls(&log);
    assert!(played.contains(&HwCall::Color(Rgb::RED)));
    assert!(played.contains(&HwCall::Beep(1.0)));
    assert_eq!(played.last(), Some(&HwCall::Color(Rgb::BLUE)));
}

#[test]
fn latched_error_waits_for_reset() {
    let (mut sm, log) = machine(true);

    sm.transition_to(SystemState::Error).unwrap();
    assert_eq!(sm.current_state(), SystemState::Error);
    let played = take(&log);
    let red_flashes = played.iter().filter(|c| **c == HwCall::Color(Rgb::RED)).count();
    assert_eq!(red_flashes, 6);
    assert!(played.contains(&HwCall::Pattern(3, 0.3)));

    // A second ERROR is a no-op while latched.
    sm.transition_to(SystemState::Error).unwrap();
    assert!(take(&log).is_empty());

    assert!(sm.reset_error().unwrap());
    assert_eq!(sm.current_state(), SystemState::Idle);
    assert_eq!(take(&log), vec![HwCall::Color(Rgb::BLUE)]);

    assert!(!sm.reset_error().unwrap());
    assert!(take(&log).is_empty());
}

#[test]
fn light_fault_still_completes_the_transition() {
    let (mut sm, log) = machine(false);
    sm.context_mut().light_mut().broken = true;

    let result = sm.transition_to(SystemState::Success);
    assert_eq!(result, Err(Error::DeviceFault(DeviceError::PwmWrite)));
    assert_eq!(sm.current_state(), SystemState::Idle);
    // The buzzer still played even though every light write failed.
    assert_eq!(calls(&log), vec![HwCall::Pattern(2, 0.2)]);
}

#[test]
fn machines_are_independent() {
    let (mut a, _) = machine(false);
    let (mut b, _) = machine(true);
    a.transition_to(SystemState::Scanning).unwrap();
    b.transition_to(SystemState::Error).unwrap();
    assert_eq!(a.current_state(), SystemState::Scanning);
    assert_eq!(b.current_state(), SystemState::Error);
}
