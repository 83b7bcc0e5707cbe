//! WiFi station-mode adapter.
//!
//! The node only needs the network for the MQTT bus, so this adapter is a
//! single blocking bring-up: validate the stored credentials, start the
//! station, wait for an IP.  The driver's own reconnect handles later drops.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`connect`] drives `esp_idf_svc::wifi`.
//! - **all other targets**: only the credential checks are built.

use core::fmt;

use super::utils::is_printable_ascii;
use crate::config::NodeConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network.
pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Check the credentials stored in `config`.
pub fn check_credentials(config: &NodeConfig) -> Result<(), ConnectivityError> {
    if config.wifi_ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    validate_ssid(&config.wifi_ssid)?;
    validate_password(&config.wifi_password)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station bring-up
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::connect;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{
        AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
    };
    use log::{error, info};

    use super::{ConnectivityError, check_credentials};
    use crate::config::NodeConfig;

    /// Bring the station up and block until the interface has an address.
    ///
    /// The returned driver must be kept alive for as long as the network is
    /// needed; dropping it stops WiFi.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        config: &NodeConfig,
    ) -> Result<BlockingWifi<EspWifi<'static>>, ConnectivityError> {
        check_credentials(config)?;

        let fail = |stage: &str, e: esp_idf_svc::sys::EspError| {
            error!("wifi: {} failed: {}", stage, e);
            ConnectivityError::ConnectionFailed
        };

        let driver = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| fail("driver", e))?;
        let mut wifi = BlockingWifi::wrap(driver, sysloop).map_err(|e| fail("wrap", e))?;

        let auth_method = if config.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: config
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: config
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|e| fail("configure", e))?;

        info!("wifi: connecting to '{}'", config.wifi_ssid);
        wifi.start().map_err(|e| fail("start", e))?;
        wifi.connect().map_err(|e| fail("connect", e))?;
        wifi.wait_netif_up().map_err(|e| fail("netif", e))?;

        if let Ok(ip) = wifi.wifi().sta_netif().get_ip_info() {
            info!("wifi: connected, ip={}", ip.ip);
        }
        Ok(wifi)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
