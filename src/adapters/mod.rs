//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements / provides | Connects to              |
//! |------------|-----------------------|--------------------------|
//! | `log_sink` | EventSink             | Serial log output        |
//! | `mqtt`     | drives MessageHandler | MQTT broker (esp-mqtt)   |
//! | `nvs`      | ConfigPort            | NVS / in-memory store    |
//! | `wifi`     | station bring-up      | ESP-IDF WiFi STA         |
//!
//! The LED and buzzer adapters live in [`crate::drivers`] next to the
//! peripheral code they wrap.

pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub(crate) mod utils;
pub mod wifi;
