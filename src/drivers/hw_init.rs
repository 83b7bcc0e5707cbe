//! One-shot hardware peripheral initialization.
//!
//! Configures the buzzer GPIO and the LEDC timer/channels for the RGB LED
//! using raw ESP-IDF sys calls, and exposes them as `embedded-hal` outputs
//! ([`LedcChannel`], [`GpioOutput`]) for the drivers.  Called once from
//! `main()` before the bus comes up.
//!
//! On host builds the outputs accept every write and touch nothing.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use embedded_hal::digital::{self, ErrorType as DigitalErrorType, OutputPin};
use embedded_hal::pwm::{self, ErrorType as PwmErrorType, SetDutyCycle};

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

/// A failed register write; carries the `esp_err_t` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteError(pub i32);

impl pwm::Error for WriteError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

impl digital::Error for WriteError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

// ── Initialisation ────────────────────────────────────────────

pub const LEDC_CH_LED_R: u32 = 0;
pub const LEDC_CH_LED_G: u32 = 1;
pub const LEDC_CH_LED_B: u32 = 2;

/// Highest LEDC duty value at [`pins::PWM_RESOLUTION_BITS`].
const LEDC_MAX_DUTY: u16 = (1 << pins::PWM_RESOLUTION_BITS) - 1;

/// Peripherals handed to the drivers after init.
pub struct Peripherals {
    pub led_red: LedcChannel,
    pub led_green: LedcChannel,
    pub led_blue: LedcChannel,
    pub buzzer: GpioOutput,
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<Peripherals, HwInitError> {
    // SAFETY: Called once from main() before any driver exists; single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(handles())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<Peripherals, HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(handles())
}

fn handles() -> Peripherals {
    Peripherals {
        led_red: LedcChannel(LEDC_CH_LED_R),
        led_green: LedcChannel(LEDC_CH_LED_G),
        led_blue: LedcChannel(LEDC_CH_LED_B),
        buzzer: GpioOutput(pins::BUZZER_GPIO),
    }
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUZZER_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    unsafe { gpio_set_level(pins::BUZZER_GPIO, 0) };

    info!("hw_init: buzzer GPIO{} configured", pins::BUZZER_GPIO);
    Ok(())
}

/// A configured push-pull output pin.
#[derive(Debug)]
pub struct GpioOutput(i32);

impl GpioOutput {
    pub fn pin(&self) -> i32 {
        self.0
    }

    #[cfg(target_os = "espidf")]
    fn set_level(&mut self, high: bool) -> Result<(), WriteError> {
        // SAFETY: the pin was configured as an output in init_gpio_outputs();
        // only the owning driver writes it.
        let ret = unsafe { gpio_set_level(self.0, u32::from(high)) };
        if ret != ESP_OK as i32 { return Err(WriteError(ret)); }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_level(&mut self, _high: bool) -> Result<(), WriteError> {
        Ok(())
    }
}

impl DigitalErrorType for GpioOutput {
    type Error = WriteError;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true)
    }
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: RGB LED (1 kHz, 10-bit)
    // SAFETY: Called from single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_10_BIT,
        freq_hz: pins::LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 { return Err(HwInitError::LedcTimerFailed(ret)); }

    // Channels 0-2: RGB LED
    let led_gpios = [pins::LED_R_GPIO, pins::LED_G_GPIO, pins::LED_B_GPIO];
    for (i, &gpio) in led_gpios.iter().enumerate() {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: (ledc_channel_t_LEDC_CHANNEL_0 + i as u32),
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK as i32 { return Err(HwInitError::LedcChannelFailed(ret)); }
    }

    info!("hw_init: LEDC configured (led=CH0-2 @ {} Hz)", pins::LED_PWM_FREQ_HZ);
    Ok(())
}

/// One configured LEDC channel.
#[derive(Debug)]
pub struct LedcChannel(u32);

impl LedcChannel {
    pub fn channel(&self) -> u32 {
        self.0
    }
}

#[cfg(target_os = "espidf")]
fn ledc_set(channel: u32, duty: u16) -> Result<(), WriteError> {
    // SAFETY: LEDC channels were configured in init_ledc(); each channel is
    // owned by exactly one LedcChannel, so duty writes don't race.
    unsafe {
        let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        if ret != ESP_OK as i32 { return Err(WriteError(ret)); }
        let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
        if ret != ESP_OK as i32 { return Err(WriteError(ret)); }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn ledc_set(_channel: u32, _duty: u16) -> Result<(), WriteError> {
    Ok(())
}

impl PwmErrorType for LedcChannel {
    type Error = WriteError;
}

impl SetDutyCycle for LedcChannel {
    fn max_duty_cycle(&self) -> u16 {
        LEDC_MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        ledc_set(self.0, duty.min(LEDC_MAX_DUTY))
    }
}
