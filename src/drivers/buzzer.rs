//! Active buzzer driver.
//!
//! A single GPIO output: HIGH sounds the buzzer, LOW silences it.  Both
//! operations block the calling thread for the whole sound, which is what
//! lets a state handler join the buzzer and the light before returning.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::SoundDevice;
use crate::error::{DeviceError, Error, Result};

/// Longest a single command may keep the buzzer busy (seconds).
pub const MAX_TONE_SECS: f32 = 60.0;

pub struct Buzzer<P: OutputPin, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> Buzzer<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    fn on(&mut self) -> Result<()> {
        self.pin.set_high().map_err(|_| DeviceError::GpioWrite.into())
    }

    fn off(&mut self) -> Result<()> {
        self.pin.set_low().map_err(|_| DeviceError::GpioWrite.into())
    }

    fn hold(&mut self, secs: f32) {
        self.delay.delay_us((secs * 1_000_000.0) as u32);
    }

    /// Sound for `secs`, always ending silent.
    fn tone(&mut self, secs: f32) -> Result<()> {
        let on = self.on();
        self.hold(secs);
        let off = self.off();
        on.and(off)
    }
}

fn check_duration(field: &'static str, secs: f32) -> Result<()> {
    if secs.is_finite() && secs > 0.0 && secs <= MAX_TONE_SECS {
        Ok(())
    } else {
        Err(Error::invalid(field, secs.to_string()))
    }
}

impl<P: OutputPin, D: DelayNs> SoundDevice for Buzzer<P, D> {
    fn beep(&mut self, secs: f32) -> Result<()> {
        check_duration("beep duration", secs)?;
        debug!("buzzer: beep {}s", secs);
        self.tone(secs)
    }

    fn pattern(&mut self, count: u32, interval_secs: f32) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        check_duration("pattern interval", interval_secs)?;
        let total = count as f32 * 2.0 * interval_secs;
        if total > MAX_TONE_SECS {
            return Err(Error::invalid("pattern length", total.to_string()));
        }

        debug!("buzzer: pattern {}x{}s", count, interval_secs);
        for _ in 0..count {
            self.tone(interval_secs)?;
            self.hold(interval_secs);
        }
        Ok(())
    }
}

impl<P: OutputPin, D> Drop for Buzzer<P, D> {
    fn drop(&mut self) {
        if self.pin.set_low().is_err() {
            warn!("buzzer: could not silence on release");
        }
    }
}
