//! MQTT bus gateway.
//!
//! Subscribes to `<prefix>#` and hands every received message to a
//! [`MessageHandler`] on the client's connection thread, so messages are
//! processed strictly one at a time in arrival order.
//!
//! ```text
//!   broker ──▶ connection thread ──▶ forward() ──▶ MessageHandler
//!                     │
//!                     └─ Connected ──▶ main thread ──▶ subscribe(<prefix>#)
//! ```
//!
//! The subscription is renewed on every `Connected` event because the
//! broker forgets it across a clean reconnect.

use core::fmt;

use log::warn;

use crate::app::ports::MessageHandler;
use crate::config::NodeConfig;

/// Keep-alive the broker is asked to enforce (seconds).
pub const KEEP_ALIVE_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttError {
    /// Client creation failed (bad URL, no memory).
    ClientInit,
    Subscribe,
    /// The connection thread could not be started.
    TaskSpawn,
    /// The connection thread stopped delivering events.
    ConnectionClosed,
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientInit => write!(f, "MQTT client init failed"),
            Self::Subscribe => write!(f, "MQTT subscribe failed"),
            Self::TaskSpawn => write!(f, "MQTT connection task spawn failed"),
            Self::ConnectionClosed => write!(f, "MQTT connection closed"),
        }
    }
}

impl std::error::Error for MqttError {}

pub fn broker_url(config: &NodeConfig) -> String {
    format!("mqtt://{}:{}", config.broker_host, config.broker_port)
}

/// Wildcard filter covering every topic under `prefix`.
pub fn subscription_topic(prefix: &str) -> String {
    format!("{}#", prefix)
}

/// `(username, password)` to send, or `None` when auth is off.
pub fn credentials(config: &NodeConfig) -> Option<(&str, &str)> {
    config
        .broker_auth
        .then_some((config.username.as_str(), config.password.as_str()))
}

pub fn decode_payload(data: &[u8]) -> Option<&str> {
    core::str::from_utf8(data).ok()
}

/// Pass one received message to `handler`.  Returns `false` if it was
/// dropped (no topic, or a payload that is not UTF-8).
pub fn forward(handler: &dyn MessageHandler, topic: Option<&str>, data: &[u8]) -> bool {
    let Some(topic) = topic else {
        warn!("mqtt: message without topic dropped");
        return false;
    };
    let Some(payload) = decode_payload(data) else {
        warn!("mqtt: non-UTF-8 payload on '{}' dropped ({} bytes)", topic, data.len());
        return false;
    };
    handler.handle_message(topic, payload);
    true
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::run;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
    use log::{error, info, warn};

    use super::{KEEP_ALIVE_SECS, MqttError, broker_url, credentials, forward, subscription_topic};
    use crate::app::ports::MessageHandler;
    use crate::config::NodeConfig;
    use crate::drivers::task_pin::{Core, spawn_on_core};

    /// Connect, subscribe and serve messages.  Only returns on failure.
    pub fn run(config: &NodeConfig, handler: Arc<dyn MessageHandler>) -> Result<(), MqttError> {
        let url = broker_url(config);
        let auth = credentials(config);
        let conf = MqttClientConfiguration {
            client_id: Some(config.client_id.as_str()),
            keep_alive_interval: Some(Duration::from_secs(KEEP_ALIVE_SECS)),
            username: auth.map(|(user, _)| user),
            password: auth.map(|(_, pass)| pass),
            ..Default::default()
        };

        let (mut client, mut connection) = EspMqttClient::new(&url, &conf).map_err(|e| {
            error!("mqtt: client init for {} failed: {}", url, e);
            MqttError::ClientInit
        })?;
        info!("mqtt: client created for {}", url);

        let (connected_tx, connected_rx) = mpsc::channel::<()>();
        spawn_on_core(Core::Pro, 5, 8, "mqtt-conn\0", move || {
            while let Ok(event) = connection.next() {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("mqtt: connected");
                        if connected_tx.send(()).is_err() {
                            break;
                        }
                    }
                    EventPayload::Disconnected => warn!("mqtt: disconnected"),
                    EventPayload::Received { topic, data, .. } => {
                        forward(handler.as_ref(), topic, data);
                    }
                    EventPayload::Error(e) => warn!("mqtt: {:?}", e),
                    _ => {}
                }
            }
            info!("mqtt: connection loop ended");
        })
        .map_err(|e| {
            error!("mqtt: connection task spawn failed: {}", e);
            MqttError::TaskSpawn
        })?;

        let filter = subscription_topic(&config.topic_prefix);
        while connected_rx.recv().is_ok() {
            client.subscribe(&filter, QoS::AtMostOnce).map_err(|e| {
                error!("mqtt: subscribe to '{}' failed: {}", filter, e);
                MqttError::Subscribe
            })?;
            info!("mqtt: subscribed to '{}'", filter);
        }
        Err(MqttError::ConnectionClosed)
    }
}
