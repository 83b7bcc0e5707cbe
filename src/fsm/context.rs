//! Device context threaded through every state handler.
//!
//! [`FsmContext`] owns the light, the buzzer and the delay used to time
//! light steps.  State handlers never touch the devices directly: they
//! hand a [`FeedbackScript`] to [`Feedback::play`], which runs the light
//! sequence and the sound cue side by side and returns once both are done.
//!
//! ```text
//!  caller ──┬── spawn ──▶ light task: step, hold, step, hold …
//!           │
//!           ├── sound cue (beep / pattern) on the caller
//!           │
//!           └── join ◀── light task
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use super::patterns::{FeedbackScript, LightStep, SoundCue};
use crate::app::ports::{LightDevice, SoundDevice};
use crate::error::{DeviceError, Error, Result};

/// What a state handler can ask of its context.
///
/// The engine is generic over this trait so the transition logic can be
/// exercised with a context that only records scripts.
pub trait Feedback {
    /// Play `script` to completion.  Device faults are recorded, not returned;
    /// the rest of the script still plays.
    fn play(&mut self, script: &FeedbackScript);

    /// `true` if ERROR must wait for an explicit reset instead of clearing
    /// itself.
    fn error_latches(&self) -> bool;

    /// Take the first fault recorded since the last call.
    fn take_fault(&mut self) -> Option<Error>;
}

/// The real feedback context: one light, one buzzer, one delay.
pub struct FsmContext<L, S, D> {
    light: L,
    sound: S,
    /// Times the holds of light steps (runs on the light task).
    delay: D,
    error_requires_reset: bool,
    fault: Option<Error>,
}

impl<L, S, D> FsmContext<L, S, D> {
    pub fn new(light: L, sound: S, delay: D, error_requires_reset: bool) -> Self {
        Self {
            light,
            sound,
            delay,
            error_requires_reset,
            fault: None,
        }
    }

    pub fn light(&self) -> &L {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut L {
        &mut self.light
    }

    pub fn sound_mut(&mut self) -> &mut S {
        &mut self.sound
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(e) = result {
            warn!("FSM: feedback fault: {}", e);
            self.fault.get_or_insert(e);
        }
    }
}

impl<L, S, D> Feedback for FsmContext<L, S, D>
where
    L: LightDevice + Send,
    S: SoundDevice,
    D: DelayNs + Send,
{
    fn play(&mut self, script: &FeedbackScript) {
        let Self {
            light,
            sound,
            delay,
            ..
        } = self;

        let (light_result, sound_result) = if script.light_is_timed() {
            std::thread::scope(|scope| {
                let task = std::thread::Builder::new()
                    .name("fsm-light".into())
                    .spawn_scoped(scope, || run_light(light, delay, script.light));

                let sound_result = run_sound(sound, script.sound);
                let light_result = match task {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err(DeviceError::TaskPanicked.into())),
                    Err(e) => {
                        warn!("FSM: light task spawn failed: {}", e);
                        Err(DeviceError::TaskSpawn.into())
                    }
                };
                (light_result, sound_result)
            })
        } else {
            // Nothing to wait on; show the colour first, then sound.
            let light_result = run_light(light, delay, script.light);
            (light_result, run_sound(sound, script.sound))
        };

        self.record(light_result);
        self.record(sound_result);
    }

    fn error_latches(&self) -> bool {
        self.error_requires_reset
    }

    fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }
}

/// Play every light step, holding each for its duration.  Keeps going after
/// a failed step and returns the first fault.
fn run_light<L: LightDevice, D: DelayNs>(
    light: &mut L,
    delay: &mut D,
    steps: &[LightStep],
) -> Result<()> {
    let mut first_fault = None;
    for step in steps {
        if let Err(e) = light.set_color(step.color) {
            first_fault.get_or_insert(e);
        }
        if !step.hold.is_zero() {
            delay.delay_ms(step.hold.as_millis() as u32);
        }
    }
    first_fault.map_or(Ok(()), Err)
}

fn run_sound<S: SoundDevice>(sound: &mut S, cue: SoundCue) -> Result<()> {
    match cue {
        SoundCue::Silent => Ok(()),
        SoundCue::Beep { secs } => {
            debug!("FSM: beep {}s", secs);
            sound.beep(secs)
        }
        SoundCue::Pattern {
            count,
            interval_secs,
        } => {
            debug!("FSM: pattern {}x{}s", count, interval_secs);
            sound.pattern(count, interval_secs)
        }
    }
}
