//! Check-in Node Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  MQTT gateway      LogEventSink   NvsAdapter   WiFi STA        │
//! │  (MessageHandler)  (EventSink)    (Config)                     │
//! │  StatusLed         Buzzer                                      │
//! │  (Light+Random)    (Sound)                                     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          FeedbackService (command router)              │    │
//! │  │          StateMachine · FsmContext                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use checkin_node::adapters::log_sink::LogEventSink;
use checkin_node::adapters::nvs::NvsAdapter;
use checkin_node::adapters::{mqtt, wifi};
use checkin_node::app::ports::MessageHandler;
use checkin_node::app::service::FeedbackService;
use checkin_node::config::NodeConfig;
use checkin_node::drivers::buzzer::Buzzer;
use checkin_node::drivers::delay::ThreadDelay;
use checkin_node::drivers::hw_init::{self, GpioOutput, LedcChannel};
use checkin_node::drivers::status_led::{RgbChannels, StatusLed};
use checkin_node::fsm::{FsmContext, SystemState};

type Node = FeedbackService<
    StatusLed<LedcChannel, LedcChannel, LedcChannel, ThreadDelay>,
    Buzzer<GpioOutput, ThreadDelay>,
    ThreadDelay,
    LogEventSink,
>;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Check-in node v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (first boot: build-time values) ─
    let config = load_config();
    info!(
        "Config: prefix='{}' broker={} error_latch={}",
        config.topic_prefix,
        mqtt::broker_url(&config),
        config.error_requires_reset
    );

    // ── 3. Peripherals and devices ────────────────────────────
    let hw = hw_init::init_peripherals().inspect_err(|e| error!("HAL init failed: {}", e))?;

    let led = StatusLed::new(
        RgbChannels::new(hw.led_red, hw.led_green, hw.led_blue, config.led_common_anode),
        ThreadDelay,
        config.cycle_settings(),
    );
    let buzzer = Buzzer::new(hw.buzzer, ThreadDelay);
    let ctx = FsmContext::new(led, buzzer, ThreadDelay, config.error_requires_reset);

    // ── 4. Router, initial feedback ───────────────────────────
    let service = Arc::new(FeedbackService::new(ctx, LogEventSink::new(), &config));
    if let Err(e) = service.start() {
        warn!("Initial feedback failed: {}", e);
    }

    // ── 5. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let _wifi = match wifi::connect(peripherals.modem, sysloop, nvs_partition, &config) {
        Ok(w) => w,
        Err(e) => {
            error!("WiFi unavailable: {}", e);
            fail(service);
            return Err(e.into());
        }
    };

    // ── 6. Serve the bus until the connection dies ────────────
    let handler: Arc<dyn MessageHandler> = service.clone();
    if let Err(e) = mqtt::run(&config, handler) {
        error!("MQTT gateway stopped: {}", e);
        fail(service);
        return Err(e.into());
    }
    Ok(())
}

/// Show ERROR, then release the devices if nothing else still holds them.
fn fail(service: Arc<Node>) {
    if let Err(e) = service.transition_to(SystemState::Error) {
        warn!("ERROR feedback failed: {}", e);
    }
    match Arc::try_unwrap(service) {
        Ok(service) => service.shutdown(),
        Err(_) => warn!("Devices still shared with the gateway, leaving them on"),
    }
}

fn load_config() -> NodeConfig {
    let seed = NodeConfig::provisioned().unwrap_or_else(|e| {
        warn!("Build-time config rejected ({}), using defaults", e);
        NodeConfig::default()
    });
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with build-time config", e);
            return seed;
        }
    };
    match nvs.load_or_seed(seed.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using build-time config", e);
            seed
        }
    }
}
