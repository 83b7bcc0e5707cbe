//! Blocking delay backed by `std::thread::sleep`.
//!
//! On ESP-IDF `sleep` yields to FreeRTOS (`vTaskDelay`), so other tasks keep
//! running while a light step or beep is held.

use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Sleeps the calling thread.  Cheap to copy into background tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
