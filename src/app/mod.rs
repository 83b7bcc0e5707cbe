//! Application core: the command router and its ports.
//!
//! [`service::FeedbackService`] turns bus messages into state transitions
//! and direct device commands.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
