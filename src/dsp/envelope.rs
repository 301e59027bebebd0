//! # Envelope Follower
//!
//! Tracks the level of a signal with separate attack and release times.
//! The delay uses it on the sidechain input, where the tracked level
//! replaces the modulation depth knob.
//!
//! ## Smoothing
//!
//! The detector is a one-pole smoother whose coefficient switches
//! depending on whether the input is rising or falling:
//!
//! ```text
//! coef = input > env ? attack_coef : release_coef
//! env  = coef * (env - input) + input
//! ```
//!
//! The coefficients use the analog RC time constant, so the envelope
//! reaches about 63% of a step after the configured attack time:
//!
//! ```text
//! coef = e^(ln(0.368) / (time_ms * sample_rate / 1000))
//! ```
//!
//! ## Detect Modes
//!
//! - **Peak** smooths `|x|`.
//! - **MeanSquare** smooths `x²`.
//! - **Rms** smooths `x²` and takes the square root of the result, which
//!   tracks perceived loudness better than peak detection.

use nih_plug::util;

/// `ln(0.368)`: one analog time constant.
const ANALOG_TIME_CONSTANT: f32 = -0.999_672_34;

/// What the detector measures before smoothing. The sidechain uses `Rms`.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    Peak,
    MeanSquare,
    Rms,
}

/// Detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub detect_mode: DetectMode,
    /// Output in dB instead of linear level.
    pub detect_db: bool,
    /// Cap the smoothed level at 1.0 before it is stored.
    pub clamp_to_unity: bool,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack_ms: 10.0,
            release_ms: 100.0,
            detect_mode: DetectMode::Peak,
            detect_db: false,
            clamp_to_unity: true,
        }
    }
}

/// Attack/release envelope detector.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    settings: EnvelopeSettings,
    sample_rate: f32,
    attack_coef: f32,
    release_coef: f32,
    /// Smoothed level before the RMS root and dB conversion.
    envelope: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f32) -> Self {
        let mut follower = Self {
            settings: EnvelopeSettings::default(),
            sample_rate,
            attack_coef: 0.0,
            release_coef: 0.0,
            envelope: 0.0,
        };
        follower.update_coefficients();
        follower
    }

    /// Clear the envelope and recompute coefficients for a new sample rate.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.envelope = 0.0;
        self.update_coefficients();
    }

    pub fn set_settings(&mut self, settings: EnvelopeSettings) {
        let times_changed = settings.attack_ms != self.settings.attack_ms
            || settings.release_ms != self.settings.release_ms;
        self.settings = settings;
        if times_changed {
            self.update_coefficients();
        }
    }

    fn update_coefficients(&mut self) {
        self.attack_coef = time_coefficient(self.settings.attack_ms, self.sample_rate);
        self.release_coef = time_coefficient(self.settings.release_ms, self.sample_rate);
    }

    /// Push one sample through the detector and return the current level,
    /// in dB when `detect_db` is set.
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = match self.settings.detect_mode {
            DetectMode::Peak => input.abs(),
            DetectMode::MeanSquare | DetectMode::Rms => input * input,
        };

        let coef = if rectified > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        let mut envelope = coef * (self.envelope - rectified) + rectified;

        // Flush denormals on the release tail.
        if envelope < f32::MIN_POSITIVE {
            envelope = 0.0;
        }
        if self.settings.clamp_to_unity {
            envelope = envelope.min(1.0);
        }
        self.envelope = envelope;

        let level = match self.settings.detect_mode {
            DetectMode::Rms => envelope.sqrt(),
            DetectMode::Peak | DetectMode::MeanSquare => envelope,
        };

        if self.settings.detect_db {
            util::gain_to_db(level)
        } else {
            level
        }
    }
}

fn time_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    let time_samples = time_ms * sample_rate * 0.001;
    if time_samples <= 0.0 {
        // Zero time: follow the input instantly.
        return 0.0;
    }
    (ANALOG_TIME_CONSTANT / time_samples).exp()
}
