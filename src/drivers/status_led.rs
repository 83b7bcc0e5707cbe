//! RGB status LED driver.
//!
//! Three PWM channels drive discrete R/G/B LEDs (or one RGB LED, common
//! cathode by default).  Channel values in `[0, 1]` map to a duty fraction
//! of `round(v * 1000) / 1000`.
//!
//! The driver also owns the random colour cycling task:
//!
//! ```text
//!  start_random ──spawn──▶ rgb-cycle: pick target ─▶ fade in N steps ─┐
//!                                  ▲                                   │
//!                                  └───────────── while active ◀───────┘
//!  stop_random / set_color ──▶ clear flag ─▶ wait ≤ stop_timeout ─▶ join
//! ```
//!
//! Channels sit behind a mutex shared with the cycling task; the task
//! always stops before a direct colour write, so only one writer is active
//! at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};
use rand::Rng;

use crate::app::ports::{LightDevice, RandomColorMode};
use crate::drivers::task_pin::{self, Core};
use crate::error::{DeviceError, Result};
use crate::fsm::patterns::Rgb;

/// Denominator of the duty fraction written per channel.
const DUTY_STEPS: u16 = 1000;

// ── Channels ──────────────────────────────────────────────────

/// The three PWM outputs plus the last colour written to them.
pub struct RgbChannels<R, G, B> {
    red: R,
    green: G,
    blue: B,
    common_anode: bool,
    current: Rgb,
}

impl<R: SetDutyCycle, G: SetDutyCycle, B: SetDutyCycle> RgbChannels<R, G, B> {
    pub fn new(red: R, green: G, blue: B, common_anode: bool) -> Self {
        Self {
            red,
            green,
            blue,
            common_anode,
            current: Rgb::OFF,
        }
    }

    /// Write a colour that is already clamped to `[0, 1]`.
    fn write(&mut self, color: Rgb) -> Result<()> {
        let r = self.duty(color.r);
        let g = self.duty(color.g);
        let b = self.duty(color.b);
        self.red
            .set_duty_cycle_fraction(r, DUTY_STEPS)
            .map_err(|_| DeviceError::PwmWrite)?;
        self.green
            .set_duty_cycle_fraction(g, DUTY_STEPS)
            .map_err(|_| DeviceError::PwmWrite)?;
        self.blue
            .set_duty_cycle_fraction(b, DUTY_STEPS)
            .map_err(|_| DeviceError::PwmWrite)?;
        self.current = color;
        Ok(())
    }

    fn duty(&self, value: f32) -> u16 {
        let on = (value * f32::from(DUTY_STEPS)).round() as u16;
        if self.common_anode { DUTY_STEPS - on } else { on }
    }
}

// ── Random cycling ────────────────────────────────────────────

/// Timing of the random cycling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSettings {
    /// Interpolation steps from one random target to the next.
    pub steps: u32,
    /// Time spent fading to each target.
    pub transition: Duration,
    /// How long a stop request waits for the task before detaching it.
    pub stop_timeout: Duration,
}

impl CycleSettings {
    pub fn step_delay(&self) -> Duration {
        self.transition / self.steps.max(1)
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            steps: 50,
            transition: Duration::from_millis(500),
            stop_timeout: Duration::from_secs(1),
        }
    }
}

struct CycleTask {
    active: Arc<AtomicBool>,
    /// Signalled by the task as it exits; dropped without a message if it
    /// panicked.
    done: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

// ── StatusLed ─────────────────────────────────────────────────

pub struct StatusLed<R: SetDutyCycle, G: SetDutyCycle, B: SetDutyCycle, D> {
    channels: Arc<Mutex<RgbChannels<R, G, B>>>,
    delay: D,
    cycle: CycleSettings,
    task: Option<CycleTask>,
}

impl<R, G, B, D> StatusLed<R, G, B, D>
where
    R: SetDutyCycle + Send + 'static,
    G: SetDutyCycle + Send + 'static,
    B: SetDutyCycle + Send + 'static,
    D: DelayNs + Clone + Send + 'static,
{
    pub fn new(channels: RgbChannels<R, G, B>, delay: D, cycle: CycleSettings) -> Self {
        Self {
            channels: Arc::new(Mutex::new(channels)),
            delay,
            cycle,
            task: None,
        }
    }

    /// Last colour written, by a command or by the cycling task.
    pub fn current_color(&self) -> Rgb {
        lock(&self.channels).current
    }

    fn spawn_cycle(
        &self,
        active: Arc<AtomicBool>,
        done: mpsc::Sender<()>,
    ) -> std::io::Result<JoinHandle<()>> {
        let channels = Arc::clone(&self.channels);
        let mut delay = self.delay.clone();
        let steps = self.cycle.steps.max(1);
        let step_us = self.cycle.step_delay().as_micros() as u32;

        task_pin::spawn_on_core(Core::App, 5, 4, "rgb-cycle\0", move || {
            let mut rng = rand::thread_rng();
            'cycle: while active.load(Ordering::Acquire) {
                let from = lock(&channels).current;
                let target = Rgb::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
                debug!("rgb: fading to {}", target);
                for i in 1..=steps {
                    if !active.load(Ordering::Acquire) {
                        break 'cycle;
                    }
                    let color = from.lerp(target, i as f32 / steps as f32).clamped();
                    if let Err(e) = lock(&channels).write(color) {
                        warn!("rgb: cycling stopped: {}", e);
                        break 'cycle;
                    }
                    delay.delay_us(step_us);
                }
            }
            let _ = done.send(());
        })
    }

    /// Drop a task that already exited on its own (e.g. after a write fault).
    fn reap_finished(&mut self) {
        if self.task.as_ref().is_some_and(|t| t.handle.is_finished()) {
            if let Some(task) = self.task.take() {
                if task.handle.join().is_err() {
                    warn!("rgb: cycling task had panicked");
                }
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R, G, B, D> LightDevice for StatusLed<R, G, B, D>
where
    R: SetDutyCycle + Send + 'static,
    G: SetDutyCycle + Send + 'static,
    B: SetDutyCycle + Send + 'static,
    D: DelayNs + Clone + Send + 'static,
{
    fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.stop_random();
        let color = color.clamped();
        debug!("rgb: {}", color);
        lock(&self.channels).write(color)
    }
}

impl<R, G, B, D> RandomColorMode for StatusLed<R, G, B, D>
where
    R: SetDutyCycle + Send + 'static,
    G: SetDutyCycle + Send + 'static,
    B: SetDutyCycle + Send + 'static,
    D: DelayNs + Clone + Send + 'static,
{
    fn start_random(&mut self) -> Result<bool> {
        self.reap_finished();
        if self.task.is_some() {
            info!("rgb: random mode already active");
            return Ok(false);
        }

        let active = Arc::new(AtomicBool::new(true));
        let (done_tx, done_rx) = mpsc::channel();
        let handle = self
            .spawn_cycle(Arc::clone(&active), done_tx)
            .map_err(|e| {
                warn!("rgb: cannot spawn cycling task: {}", e);
                DeviceError::TaskSpawn
            })?;

        self.task = Some(CycleTask {
            active,
            done: done_rx,
            handle,
        });
        info!("rgb: random mode started");
        Ok(true)
    }

    fn stop_random(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.active.store(false, Ordering::Release);

        match task.done.recv_timeout(self.cycle.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if task.handle.join().is_err() {
                    warn!("rgb: cycling task had panicked");
                }
                info!("rgb: random mode stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "rgb: cycling task did not stop within {:?}, detaching",
                    self.cycle.stop_timeout
                );
            }
        }
        true
    }

    fn random_active(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }
}

impl<R: SetDutyCycle, G: SetDutyCycle, B: SetDutyCycle, D> Drop for StatusLed<R, G, B, D> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.active.store(false, Ordering::Release);
            let _ = task.done.recv_timeout(self.cycle.stop_timeout);
        }
        if let Err(e) = lock(&self.channels).write(Rgb::OFF) {
            warn!("rgb: could not switch off: {}", e);
        }
        info!("rgb: released");
    }
}
