//! Feedback scripts: the light sequence and sound cue played on entering
//! each state.
//!
//! | State           | Light                          | Sound            |
//! |-----------------|--------------------------------|------------------|
//! | Idle            | solid blue                     | silent           |
//! | Scanning        | solid yellow                   | beep 0.2 s       |
//! | Success         | green, off, green (0.2 s)      | 2 beeps @ 0.2 s  |
//! | Failure         | red held 1 s                   | beep 1.0 s       |
//! | AlreadyScanned  | green double flash (0.1 s)     | 3 beeps @ 0.1 s  |
//! | Error           | 6 × red on/off (0.1 s)         | 3 beeps @ 0.3 s  |

use core::time::Duration;

// ── Colour ────────────────────────────────────────────────────

/// RGB intensity triple, each channel nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const OFF: Self = Self::new(0.0, 0.0, 0.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::new(1.0, 1.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Clamp every channel into `[0, 1]`.  NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self::new(clamp_unit(self.r), clamp_unit(self.g), clamp_unit(self.b))
    }

    /// Linear interpolation towards `target`; `t = 0` is `self`, `t = 1` is `target`.
    pub fn lerp(self, target: Self, t: f32) -> Self {
        Self::new(
            self.r + (target.r - self.r) * t,
            self.g + (target.g - self.g) * t,
            self.b + (target.b - self.b) * t,
        )
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

impl core::fmt::Display for Rgb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.r, self.g, self.b)
    }
}

// ── Script building blocks ────────────────────────────────────

/// One step of a light sequence: show `color`, then hold it for `hold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightStep {
    pub color: Rgb,
    pub hold: Duration,
}

impl LightStep {
    /// Show a colour and move on immediately.
    pub const fn solid(color: Rgb) -> Self {
        Self {
            color,
            hold: Duration::ZERO,
        }
    }

    pub const fn held(color: Rgb, hold_ms: u64) -> Self {
        Self {
            color,
            hold: Duration::from_millis(hold_ms),
        }
    }
}

/// What the buzzer does while the light sequence runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundCue {
    Silent,
    Beep { secs: f32 },
    Pattern { count: u32, interval_secs: f32 },
}

/// Light sequence and sound cue for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackScript {
    pub light: &'static [LightStep],
    pub sound: SoundCue,
}

impl FeedbackScript {
    /// `true` if any light step holds its colour, i.e. the light sequence
    /// takes time and must run alongside the sound cue.
    pub fn light_is_timed(&self) -> bool {
        self.light.iter().any(|s| !s.hold.is_zero())
    }

    /// Total time the light sequence spends holding colours.
    #[cfg(test)]
    fn light_duration(&self) -> Duration {
        self.light.iter().map(|s| s.hold).sum()
    }
}

/// Build `N` alternating `color`/off steps, each held for `step_ms`.
const fn flash<const N: usize>(color: Rgb, step_ms: u64) -> [LightStep; N] {
    let mut steps = [LightStep::held(Rgb::OFF, step_ms); N];
    let mut i = 0;
    while i < N {
        if i % 2 == 0 {
            steps[i] = LightStep::held(color, step_ms);
        }
        i += 1;
    }
    steps
}

// ── Per-state scripts ─────────────────────────────────────────

pub const IDLE: FeedbackScript = FeedbackScript {
    light: &[LightStep::solid(Rgb::BLUE)],
    sound: SoundCue::Silent,
};

pub const SCANNING: FeedbackScript = FeedbackScript {
    light: &[LightStep::solid(Rgb::YELLOW)],
    sound: SoundCue::Beep { secs: 0.2 },
};

pub const SUCCESS: FeedbackScript = FeedbackScript {
    light: &[
        LightStep::held(Rgb::GREEN, 200),
        LightStep::held(Rgb::OFF, 200),
        LightStep::solid(Rgb::GREEN),
    ],
    sound: SoundCue::Pattern {
        count: 2,
        interval_secs: 0.2,
    },
};

pub const FAILURE: FeedbackScript = FeedbackScript {
    light: &[LightStep::held(Rgb::RED, 1000)],
    sound: SoundCue::Beep { secs: 1.0 },
};

pub const ALREADY_SCANNED: FeedbackScript = FeedbackScript {
    light: &[
        LightStep::held(Rgb::GREEN, 100),
        LightStep::held(Rgb::OFF, 100),
        LightStep::held(Rgb::GREEN, 100),
        LightStep::held(Rgb::OFF, 100),
        LightStep::solid(Rgb::GREEN),
    ],
    sound: SoundCue::Pattern {
        count: 3,
        interval_secs: 0.1,
    },
};

const ERROR_FLASH: [LightStep; 12] = flash(Rgb::RED, 100);

pub const ERROR: FeedbackScript = FeedbackScript {
    light: &ERROR_FLASH,
    sound: SoundCue::Pattern {
        count: 3,
        interval_secs: 0.3,
    },
};
