//! Node configuration parameters
//!
//! All tunable parameters for the check-in feedback node.
//! Values are loaded from NVS at boot.  On first boot the node stores the
//! defaults overlaid with any `CHECKIN_*` variables set when the firmware
//! was built (see [`NodeConfig::provisioned`]).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::utils::is_printable_ascii;
use crate::app::ports::ConfigError;
use crate::drivers::status_led::CycleSettings;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Bus ---
    /// Prefix of every topic this node listens on, including the trailing `/`
    pub topic_prefix: String,
    /// MQTT broker host name or address
    pub broker_host: String,
    pub broker_port: u16,
    /// Send `username`/`password` when connecting
    pub broker_auth: bool,
    pub username: String,
    pub password: String,
    pub client_id: String,

    // --- WiFi ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,

    // --- Random colour cycling ---
    /// Interpolation steps per random target
    pub random_steps: u16,
    /// Time to fade from one random target to the next (milliseconds)
    pub random_transition_ms: u32,
    /// How long a stop request waits for the cycling task (milliseconds)
    pub random_stop_timeout_ms: u32,

    // --- Behaviour ---
    /// Keep ERROR until a reset message instead of returning to IDLE
    pub error_requires_reset: bool,
    /// LED is wired common-anode (PWM duty inverted)
    pub led_common_anode: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Bus
            topic_prefix: "checkin/".into(),
            broker_host: "localhost".into(),
            broker_port: 1883,
            broker_auth: true,
            username: String::new(),
            password: String::new(),
            client_id: "checkin-node".into(),

            // WiFi
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),

            // Random cycling
            random_steps: 50,
            random_transition_ms: 500,  // 10 ms per step
            random_stop_timeout_ms: 1000,

            // Behaviour
            error_requires_reset: false,
            led_common_anode: false,
        }
    }
}

/// Build-time provisioning variables, e.g.
/// `CHECKIN_WIFI_SSID=Lobby CHECKIN_BROKER=10.0.0.5 cargo build --features espidf`.
pub const PROVISION_KEYS: [&str; 9] = [
    "CHECKIN_WIFI_SSID",
    "CHECKIN_WIFI_PASSWORD",
    "CHECKIN_BROKER",
    "CHECKIN_BROKER_PORT",
    "CHECKIN_BROKER_AUTH",
    "CHECKIN_USERNAME",
    "CHECKIN_PASSWORD",
    "CHECKIN_TOPIC_PREFIX",
    "CHECKIN_CLIENT_ID",
];

/// Values baked in by the compiler; `option_env!` needs literal names.
fn build_env(key: &str) -> Option<&'static str> {
    match key {
        "CHECKIN_WIFI_SSID" => option_env!("CHECKIN_WIFI_SSID"),
        "CHECKIN_WIFI_PASSWORD" => option_env!("CHECKIN_WIFI_PASSWORD"),
        "CHECKIN_BROKER" => option_env!("CHECKIN_BROKER"),
        "CHECKIN_BROKER_PORT" => option_env!("CHECKIN_BROKER_PORT"),
        "CHECKIN_BROKER_AUTH" => option_env!("CHECKIN_BROKER_AUTH"),
        "CHECKIN_USERNAME" => option_env!("CHECKIN_USERNAME"),
        "CHECKIN_PASSWORD" => option_env!("CHECKIN_PASSWORD"),
        "CHECKIN_TOPIC_PREFIX" => option_env!("CHECKIN_TOPIC_PREFIX"),
        "CHECKIN_CLIENT_ID" => option_env!("CHECKIN_CLIENT_ID"),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl NodeConfig {
    /// Defaults overlaid with the build-time `CHECKIN_*` values.
    pub fn provisioned() -> Result<Self, ConfigError> {
        Self::default().with_overrides(build_env)
    }

    /// Overlay the `CHECKIN_*` values `lookup` yields onto `self`, then
    /// validate the result.  Unset and empty values leave a field alone.
    pub fn with_overrides<'a, F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("CHECKIN_WIFI_SSID") {
            self.wifi_ssid.clear();
            self.wifi_ssid
                .push_str(v)
                .map_err(|_| ConfigError::ValidationFailed("wifi_ssid longer than 32 bytes"))?;
        }
        if let Some(v) = get("CHECKIN_WIFI_PASSWORD") {
            self.wifi_password.clear();
            self.wifi_password
                .push_str(v)
                .map_err(|_| ConfigError::ValidationFailed("wifi_password longer than 64 bytes"))?;
        }
        if let Some(v) = get("CHECKIN_BROKER") {
            self.broker_host = v.to_string();
        }
        if let Some(v) = get("CHECKIN_BROKER_PORT") {
            self.broker_port = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationFailed("broker_port must be 1-65535"))?;
        }
        if let Some(v) = get("CHECKIN_BROKER_AUTH") {
            self.broker_auth = parse_flag(v)
                .ok_or(ConfigError::ValidationFailed("broker_auth must be 0/1 or true/false"))?;
        }
        if let Some(v) = get("CHECKIN_USERNAME") {
            self.username = v.to_string();
        }
        if let Some(v) = get("CHECKIN_PASSWORD") {
            self.password = v.to_string();
        }
        if let Some(v) = get("CHECKIN_TOPIC_PREFIX") {
            self.topic_prefix = v.to_string();
        }
        if let Some(v) = get("CHECKIN_CLIENT_ID") {
            self.client_id = v.to_string();
        }

        self.validate()?;
        Ok(self)
    }

    /// Range-check every field.  Callers reject invalid values rather than
    /// clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.topic_prefix.as_str();
        if prefix.is_empty() || prefix.len() > 64 || !prefix.ends_with('/') {
            return Err(ConfigError::ValidationFailed(
                "topic_prefix must be 1-64 bytes ending in '/'",
            ));
        }
        if !is_printable_ascii(prefix) || prefix.contains(['#', '+']) {
            return Err(ConfigError::ValidationFailed(
                "topic_prefix must be printable ASCII without wildcards",
            ));
        }
        if self.broker_host.is_empty()
            || self.broker_host.len() > 128
            || !is_printable_ascii(&self.broker_host)
        {
            return Err(ConfigError::ValidationFailed(
                "broker_host must be 1-128 printable ASCII bytes",
            ));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be non-zero"));
        }
        if self.client_id.is_empty() || self.client_id.len() > 23 {
            return Err(ConfigError::ValidationFailed("client_id must be 1-23 bytes"));
        }
        if !(1..=1000).contains(&self.random_steps) {
            return Err(ConfigError::ValidationFailed("random_steps must be 1-1000"));
        }
        if !(10..=60_000).contains(&self.random_transition_ms) {
            return Err(ConfigError::ValidationFailed(
                "random_transition_ms must be 10-60000",
            ));
        }
        if !(10..=10_000).contains(&self.random_stop_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "random_stop_timeout_ms must be 10-10000",
            ));
        }
        Ok(())
    }

    /// Timing for the LED's random cycling task.
    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            steps: u32::from(self.random_steps.max(1)),
            transition: Duration::from_millis(u64::from(self.random_transition_ms)),
            stop_timeout: Duration::from_millis(u64::from(self.random_stop_timeout_ms)),
        }
    }
}
