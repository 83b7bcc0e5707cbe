//! Unified error types for the check-in feedback node.
//!
//! A single `Error` enum covers everything that can go wrong while a bus
//! message is processed.  None of these errors outlive one message: the
//! [`FeedbackService`](crate::app::service::FeedbackService) logs them,
//! reports them through the event sink, and carries on.

use core::fmt;

use crate::app::commands::Device;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation on the command path funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A state-topic payload did not name any [`SystemState`](crate::fsm::SystemState).
    InvalidState(String),
    /// A numeric parameter was malformed (non-numeric, non-finite, wrong
    /// arity or out of range).
    InvalidParameter {
        /// Which parameter was rejected, e.g. `"beep duration"`.
        field: &'static str,
        /// The raw text (or value) that failed validation.
        raw: String,
    },
    /// A command that requires parameters arrived without any.
    MissingParameter(&'static str),
    /// The topic named a device this node does not drive.
    UnknownDevice(String),
    /// The device is known but the command is not.
    UnknownCommand { device: Device, command: String },
    /// A device adapter failed to apply a value.
    DeviceFault(DeviceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState(name) => write!(f, "invalid state: {name:?}"),
            Self::InvalidParameter { field, raw } => {
                write!(f, "invalid parameter {field}: {raw:?}")
            }
            Self::MissingParameter(cmd) => write!(f, "{cmd} requires parameters"),
            Self::UnknownDevice(dev) => write!(f, "unknown device: {dev:?}"),
            Self::UnknownCommand { device, command } => {
                write!(f, "unknown {device} command: {command:?}")
            }
            Self::DeviceFault(e) => write!(f, "device fault: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid(field: &'static str, raw: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            raw: raw.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Device faults
// ---------------------------------------------------------------------------

/// Failures raised at the hardware adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// A PWM duty-cycle write failed.
    PwmWrite,
    /// A GPIO level write failed.
    GpioWrite,
    /// A background or fork-join task could not be spawned.
    TaskSpawn,
    /// A feedback task panicked before finishing its sequence.
    TaskPanicked,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWrite => write!(f, "PWM write failed"),
            Self::GpioWrite => write!(f, "GPIO write failed"),
            Self::TaskSpawn => write!(f, "task spawn failed"),
            Self::TaskPanicked => write!(f, "feedback task panicked"),
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::DeviceFault(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
