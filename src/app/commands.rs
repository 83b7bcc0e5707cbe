//! Inbound commands to the feedback service.
//!
//! A bus message is parsed into a [`Command`] by the pure function
//! [`parse_message`]; the [`FeedbackService`](super::service::FeedbackService)
//! then dispatches on the variant.  Nothing here touches a device, so a
//! malformed message can never cause a partial device call.
//!
//! ```text
//!  P/state   "SUCCESS"            → Command::State(Success)
//!  P/buzzer  "pattern:4,0.1"      → Buzzer(Pattern { count: 4, interval_secs: 0.1 })
//!  P/rgb     "color:0.5,0.2,1.5"  → Rgb(Color(0.5, 0.2, 1.5))   (clamped later)
//!  P/reset   *                    → Command::Reset
//! ```

use core::fmt;

use crate::error::{Error, Result};
use crate::fsm::SystemState;
use crate::fsm::patterns::Rgb;

/// Default `beep` duration when no parameter is given.
pub const DEFAULT_BEEP_SECS: f32 = 1.0;
/// Default `pattern` beep count when no parameters are given.
pub const DEFAULT_PATTERN_COUNT: u32 = 3;
/// Default `pattern` on/off interval when no parameters are given.
pub const DEFAULT_PATTERN_INTERVAL_SECS: f32 = 0.2;

/// Output devices addressable by topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Buzzer,
    Rgb,
}

impl Device {
    /// Topic name of the device (the part after the prefix).
    pub const fn topic_name(self) -> &'static str {
        match self {
            Self::Buzzer => "buzzer",
            Self::Rgb => "rgb",
        }
    }

    fn from_topic_name(name: &str) -> Option<Self> {
        match name {
            "buzzer" => Some(Self::Buzzer),
            "rgb" => Some(Self::Rgb),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuzzerCommand {
    Beep { secs: f32 },
    Pattern { count: u32, interval_secs: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RgbCommand {
    /// Raw channels as received; the light clamps them.
    Color(Rgb),
    /// Start random colour cycling.
    Random,
}

/// A direct device command, bypassing the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    Buzzer(BuzzerCommand),
    Rgb(RgbCommand),
}

impl DeviceCommand {
    pub fn device(&self) -> Device {
        match self {
            Self::Buzzer(_) => Device::Buzzer,
            Self::Rgb(_) => Device::Rgb,
        }
    }
}

/// Everything a bus message can ask for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Transition the state machine.
    State(SystemState),
    /// Acknowledge a latched error.
    Reset,
    Device(DeviceCommand),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one bus message.
///
/// Topics ending in `/state` carry a state name.  Any other topic names a
/// device once `prefix` is stripped, and its payload is `command[:params]`.
pub fn parse_message(prefix: &str, topic: &str, payload: &str) -> Result<Command> {
    let suffix = topic.rsplit('/').next().unwrap_or(topic);
    if suffix == "state" {
        return payload.parse().map(Command::State);
    }

    let device = topic.strip_prefix(prefix).unwrap_or(topic);
    if device == "reset" {
        return Ok(Command::Reset);
    }

    let (command, params) = match payload.split_once(':') {
        Some((command, params)) if !params.is_empty() => (command, Some(params)),
        Some((command, _)) => (command, None),
        None => (payload, None),
    };

    let parsed = match Device::from_topic_name(device) {
        Some(Device::Buzzer) => DeviceCommand::Buzzer(parse_buzzer(command, params)?),
        Some(Device::Rgb) => DeviceCommand::Rgb(parse_rgb(command, params)?),
        None => return Err(Error::UnknownDevice(device.into())),
    };
    Ok(Command::Device(parsed))
}

fn parse_buzzer(command: &str, params: Option<&str>) -> Result<BuzzerCommand> {
    match command {
        "beep" => {
            let secs = match params {
                Some(raw) => parse_float("beep duration", raw)?,
                None => DEFAULT_BEEP_SECS,
            };
            Ok(BuzzerCommand::Beep { secs })
        }
        "pattern" => {
            let Some(raw) = params else {
                return Ok(BuzzerCommand::Pattern {
                    count: DEFAULT_PATTERN_COUNT,
                    interval_secs: DEFAULT_PATTERN_INTERVAL_SECS,
                });
            };
            let [count, interval] = split_exact::<2>("pattern", raw)?;
            Ok(BuzzerCommand::Pattern {
                count: parse_count("pattern count", count)?,
                interval_secs: parse_float("pattern interval", interval)?,
            })
        }
        other => Err(Error::UnknownCommand {
            device: Device::Buzzer,
            command: other.into(),
        }),
    }
}

fn parse_rgb(command: &str, params: Option<&str>) -> Result<RgbCommand> {
    match command {
        "color" => {
            let raw = params.ok_or(Error::MissingParameter("color"))?;
            let [r, g, b] = split_exact::<3>("color", raw)?;
            Ok(RgbCommand::Color(Rgb::new(
                parse_float("color red", r)?,
                parse_float("color green", g)?,
                parse_float("color blue", b)?,
            )))
        }
        "random" => Ok(RgbCommand::Random),
        other => Err(Error::UnknownCommand {
            device: Device::Rgb,
            command: other.into(),
        }),
    }
}

/// Split a comma list into exactly `N` pieces.
fn split_exact<'a, const N: usize>(field: &'static str, raw: &'a str) -> Result<[&'a str; N]> {
    let mut parts = raw.split(',');
    let mut out = [""; N];
    for slot in &mut out {
        *slot = parts.next().ok_or_else(|| Error::invalid(field, raw))?;
    }
    match parts.next() {
        Some(_) => Err(Error::invalid(field, raw)),
        None => Ok(out),
    }
}

fn parse_float(field: &'static str, raw: &str) -> Result<f32> {
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::invalid(field, raw)),
    }
}

/// A non-negative whole number; `"4"` and `"4.0"` are both accepted.
fn parse_count(field: &'static str, raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => {
            Ok(v as u32)
        }
        _ => Err(Error::invalid(field, raw)),
    }
}
