//! Outbound application events.
//!
//! The [`FeedbackService`](super::service::FeedbackService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them: log to serial, publish a status
//! topic, etc.

use crate::error::Error;
use crate::fsm::SystemState;

use super::commands::DeviceCommand;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(SystemState),

    /// The state machine moved, including chained returns to Idle.
    StateChanged { from: SystemState, to: SystemState },

    /// A direct device command was applied.
    DeviceCommandApplied(DeviceCommand),

    /// A bus message was rejected or a device reported a fault.
    CommandRejected(Error),

    /// The service is shutting down and its devices are being released.
    ShuttingDown,
}
