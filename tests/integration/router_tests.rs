//! Bus messages through `FeedbackService::route` down to device calls.

use checkin_node::app::commands::{BuzzerCommand, Device, DeviceCommand, RgbCommand};
use checkin_node::app::events::AppEvent;
use checkin_node::app::ports::MessageHandler;
use checkin_node::config::NodeConfig;
use checkin_node::error::Error;
use checkin_node::fsm::SystemState;
use checkin_node::fsm::patterns::Rgb;

use super::mock_hw::{HwCall, calls, service};

fn default_service() -> (super::mock_hw::MockService, super::mock_hw::CallLog, super::mock_hw::EventLog) {
    service(&NodeConfig::default())
}

#[test]
fn every_state_name_routes() {
    let (svc, _log, _events) = default_service();
    for state in SystemState::ALL {
        svc.route("checkin/state", state.name()).unwrap();
        let expected = match state {
            SystemState::Scanning => SystemState::Scanning,
            _ => SystemState::Idle,
        };
        assert_eq!(svc.state(), expected, "after {state}");
    }
}

#[test]
fn invalid_state_name_changes_nothing() {
    let (svc, log, events) = default_service();
    svc.route("checkin/state", "SCANNING").unwrap();
    log.lock().unwrap().clear();
    events.lock().unwrap().clear();

    let err = svc.route("checkin/state", "scanning").unwrap_err();
    assert_eq!(err, Error::InvalidState("scanning".into()));
    assert_eq!(svc.state(), SystemState::Scanning);
    assert!(calls(&log).is_empty());
    assert_eq!(
        *events.lock().unwrap(),
        vec![AppEvent::CommandRejected(err)]
    );
}

#[test]
fn scanning_then_success_sequence() {
    let (svc, log, events) = default_service();
    svc.route("checkin/state", "SCANNING").unwrap();
    svc.route("checkin/state", "SUCCESS").unwrap();

    let played = calls(&log);
    assert_eq!(&played[..2], &[HwCall::Color(Rgb::YELLOW), HwCall::Beep(0.2)]);
    assert!(played.contains(&HwCall::Pattern(2, 0.2)));
    assert_eq!(played.last(), Some(&HwCall::Color(Rgb::BLUE)));
    assert_eq!(svc.state(), SystemState::Idle);

    let changes: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (SystemState::Idle, SystemState::Scanning),
            (SystemState::Scanning, SystemState::Success),
            (SystemState::Success, SystemState::Idle),
        ]
    );
}

#[test]
fn color_is_clamped() {
    let (svc, log, events) = default_service();
    svc.route("checkin/rgb", "color:0.5,0.2,1.5").unwrap();
    assert_eq!(calls(&log), vec![HwCall::Color(Rgb::new(0.5, 0.2, 1.0))]);
    assert_eq!(
        *events.lock().unwrap(),
        vec![AppEvent::DeviceCommandApplied(DeviceCommand::Rgb(
            RgbCommand::Color(Rgb::new(0.5, 0.2, 1.5))
        ))]
    );
}

#[test]
fn buzzer_commands_and_defaults() {
    let (svc, log, _events) = default_service();
    svc.route("checkin/buzzer", "pattern:4,0.1").unwrap();
    svc.route("checkin/buzzer", "pattern").unwrap();
    svc.route("checkin/buzzer", "beep:0.5").unwrap();
    svc.route("checkin/buzzer", "beep").unwrap();
    assert_eq!(
        calls(&log),
        vec![
            HwCall::Pattern(4, 0.1),
            HwCall::Pattern(3, 0.2),
            HwCall::Beep(0.5),
            HwCall::Beep(1.0),
        ]
    );
}

#[test]
fn random_twice_starts_once_and_color_stops_it() {
    let (svc, log, _events) = default_service();
    svc.route("checkin/rgb", "random").unwrap();
    svc.route("checkin/rgb", "random").unwrap();
    svc.route("checkin/rgb", "color:1,0,0").unwrap();
    assert_eq!(
        calls(&log),
        vec![
            HwCall::RandomStart,
            HwCall::RandomStop,
            HwCall::Color(Rgb::RED),
        ]
    );
}

#[test]
fn state_change_stops_random_mode() {
    let (svc, log, _events) = default_service();
    svc.route("checkin/rgb", "random").unwrap();
    svc.route("checkin/state", "SCANNING").unwrap();
    assert_eq!(
        calls(&log),
        vec![
            HwCall::RandomStart,
            HwCall::RandomStop,
            HwCall::Color(Rgb::YELLOW),
            HwCall::Beep(0.2),
        ]
    );
}

#[test]
fn malformed_device_messages_are_rejected_untouched() {
    let (svc, log, _events) = default_service();
    let cases = [
        ("checkin/rgb", "color"),
        ("checkin/rgb", "color:1,0"),
        ("checkin/rgb", "color:a,b,c"),
        ("checkin/rgb", "blink"),
        ("checkin/buzzer", "beep:loud"),
        ("checkin/buzzer", "pattern:4"),
        ("checkin/buzzer", "chirp"),
        ("checkin/fan", "on"),
    ];
    for (topic, payload) in cases {
        assert!(svc.route(topic, payload).is_err(), "{topic} {payload:?} accepted");
    }
    assert!(calls(&log).is_empty());
    assert_eq!(svc.state(), SystemState::Idle);
}

#[test]
fn error_kinds_are_specific() {
    let (svc, _log, _events) = default_service();
    assert_eq!(
        svc.route("checkin/rgb", "color"),
        Err(Error::MissingParameter("color"))
    );
    assert_eq!(
        svc.route("checkin/fan", "on"),
        Err(Error::UnknownDevice("fan".into()))
    );
    assert_eq!(
        svc.route("checkin/buzzer", "chirp"),
        Err(Error::UnknownCommand {
            device: Device::Buzzer,
            command: "chirp".into()
        })
    );
}

#[test]
fn reset_clears_latched_error() {
    let config = NodeConfig {
        error_requires_reset: true,
        ..Default::default()
    };
    let (svc, log, _events) = service(&config);

    svc.route("checkin/state", "ERROR").unwrap();
    assert_eq!(svc.state(), SystemState::Error);

    log.lock().unwrap().clear();
    svc.route("checkin/reset", "").unwrap();
    assert_eq!(svc.state(), SystemState::Idle);
    assert_eq!(calls(&log), vec![HwCall::Color(Rgb::BLUE)]);
}

#[test]
fn custom_prefix() {
    let config = NodeConfig {
        topic_prefix: "lobby/door1/".into(),
        ..Default::default()
    };
    let (svc, log, _events) = service(&config);
    assert_eq!(svc.topic_prefix(), "lobby/door1/");
    svc.route("lobby/door1/buzzer", "beep:0.1").unwrap();
    assert_eq!(calls(&log), vec![HwCall::Beep(0.1)]);
}

#[test]
fn handle_message_swallows_errors() {
    let (svc, log, events) = default_service();
    svc.handle_message("checkin/state", "NOPE");
    svc.handle_message("checkin/buzzer", "beep:0.3");
    assert_eq!(calls(&log), vec![HwCall::Beep(0.3)]);
    let events = events.lock().unwrap();
    assert!(matches!(events[0], AppEvent::CommandRejected(Error::InvalidState(_))));
    assert_eq!(
        events[1],
        AppEvent::DeviceCommandApplied(DeviceCommand::Buzzer(BuzzerCommand::Beep { secs: 0.3 }))
    );
}

#[test]
fn messages_from_many_threads_are_serialised() {
    let (svc, log, _events) = default_service();
    let svc = std::sync::Arc::new(svc);
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            std::thread::spawn(move || {
                for _ in 0..5 {
                    svc.handle_message("checkin/state", "FAILURE");
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(svc.state(), SystemState::Idle);
    let beeps = calls(&log)
        .iter()
        .filter(|c| **c == HwCall::Beep(1.0))
        .count();
    assert_eq!(beeps, 20);
}

#[test]
fn shutdown_stops_random_mode_and_reports() {
    let (svc, log, events) = default_service();
    svc.route("checkin/rgb", "random").unwrap();
    events.lock().unwrap().clear();

    svc.shutdown();
    assert_eq!(calls(&log), vec![HwCall::RandomStart, HwCall::RandomStop]);
    assert_eq!(*events.lock().unwrap(), vec![AppEvent::ShuttingDown]);
}
