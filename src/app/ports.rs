//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StateMachine / FeedbackService (domain)
//! ```
//!
//! Device adapters implement the capability traits; the state machine and
//! the command router only ever see these traits, so recording test
//! doubles can stand in for the LED and buzzer.

use crate::config::NodeConfig;
use crate::error::Result;
use crate::fsm::patterns::Rgb;

// ───────────────────────────────────────────────────────────────
// Device capabilities (driven adapters: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// An RGB light.
pub trait LightDevice {
    /// Show `color`.  Channels outside `[0, 1]` are clamped, never rejected.
    fn set_color(&mut self, color: Rgb) -> Result<()>;
}

/// A buzzer.  Both calls block until the sound has finished.
pub trait SoundDevice {
    /// Sound once for `secs` seconds.  Non-positive durations are rejected
    /// with `InvalidParameter` before the device is touched.
    fn beep(&mut self, secs: f32) -> Result<()>;

    /// Sound `count` times, `interval_secs` on then `interval_secs` off.
    /// `count == 0` is a no-op.
    fn pattern(&mut self, count: u32, interval_secs: f32) -> Result<()>;
}

/// Continuous random colour cycling, an extension some lights offer on
/// top of [`LightDevice`].
///
/// Implementations must stop cycling before any [`LightDevice::set_color`]
/// takes effect, so only one path drives the colour at a time.
pub trait RandomColorMode {
    /// Start cycling.  Returns `Ok(false)` if cycling was already running.
    fn start_random(&mut self) -> Result<bool>;

    /// Stop cycling, waiting a bounded time for the task to exit.
    /// Returns `true` if cycling was running.
    fn stop_random(&mut self) -> bool;

    fn random_active(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Bus inbound port (driving adapter: message bus → domain)
// ───────────────────────────────────────────────────────────────

/// Whatever the bus gateway hands inbound messages to.
pub trait MessageHandler: Send + Sync {
    /// Process one message to completion.  Never fails: errors are logged
    /// and reported through the event sink.
    fn handle_message(&self, topic: &str, payload: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST call [`NodeConfig::validate`] before persisting and
/// reject invalid values instead of clamping them.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> core::result::Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> core::result::Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
