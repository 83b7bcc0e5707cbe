//! Fuzz target: `parse_message`
//!
//! Splits arbitrary bytes into a topic and a payload at the first NUL and
//! asserts that parsing never panics and that accepted colour and pattern
//! commands only carry finite numbers.
//!
//! cargo fuzz run fuzz_message_parser

#![no_main]

use checkin_node::app::commands::{BuzzerCommand, Command, DeviceCommand, RgbCommand, parse_message};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let (topic, payload) = text.split_once('\0').unwrap_or((text, ""));

    match parse_message("checkin/", topic, payload) {
        Ok(Command::Device(DeviceCommand::Rgb(RgbCommand::Color(c)))) => {
            assert!(c.r.is_finite() && c.g.is_finite() && c.b.is_finite());
            let clamped = c.clamped();
            assert!((0.0..=1.0).contains(&clamped.r));
        }
        Ok(Command::Device(DeviceCommand::Buzzer(BuzzerCommand::Beep { secs }))) => {
            assert!(secs.is_finite());
        }
        Ok(Command::Device(DeviceCommand::Buzzer(BuzzerCommand::Pattern { interval_secs, .. }))) => {
            assert!(interval_secs.is_finite());
        }
        _ => {}
    }
});
