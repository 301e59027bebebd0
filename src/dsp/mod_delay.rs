//! # Modulated Delay Tap
//!
//! A single-tap delay with its own feedback and dry/wet levels. The
//! four-tap engine hands it a new delay time every sample when it runs
//! as a flanger, vibrato or chorus.
//!
//! ```text
//! Input ──┬───────────────────────────── × dry ──┐
//!         │                                      │
//!         └──►(+)──► [Delay Line] ──┬── × wet ──(+)──► Output
//!              ▲                    │
//!              └──── × feedback ────┘
//! ```
//!
//! Dry and wet levels are set in dB. They are converted to gains only when
//! they change, so a per-sample delay sweep costs no `powf`.

use std::num::NonZeroUsize;

use nih_plug::util;

use super::delay_line::DelayLine;

/// Settings of the modulated tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulatedDelayParameters {
    pub delay_ms: f32,
    pub dry_level_db: f32,
    pub wet_level_db: f32,
    /// Percent of the tap output fed back into the line, 0–100.
    pub feedback_pct: f32,
}

impl Default for ModulatedDelayParameters {
    fn default() -> Self {
        Self {
            delay_ms: 0.0,
            dry_level_db: -3.0,
            wet_level_db: -3.0,
            feedback_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModulatedDelay {
    parameters: ModulatedDelayParameters,
    delay_line: DelayLine,
    sample_rate: f32,
    buffer_length_ms: f32,
    delay_samples: f32,
    dry_gain: f32,
    wet_gain: f32,
}

impl Default for ModulatedDelay {
    fn default() -> Self {
        let parameters = ModulatedDelayParameters::default();
        Self {
            parameters,
            delay_line: DelayLine::new(NonZeroUsize::MIN),
            sample_rate: 0.0,
            buffer_length_ms: 0.0,
            delay_samples: 0.0,
            dry_gain: util::db_to_gain(parameters.dry_level_db),
            wet_gain: util::db_to_gain(parameters.wet_level_db),
        }
    }
}

impl ModulatedDelay {
    /// Allocate a line holding `buffer_length_ms` at `sample_rate`.
    ///
    /// This is the only method that allocates.
    pub fn create_delay_buffer(&mut self, sample_rate: f32, buffer_length_ms: f32) {
        self.sample_rate = sample_rate;
        self.buffer_length_ms = buffer_length_ms;
        let capacity = buffer_capacity(sample_rate, buffer_length_ms);
        self.delay_line = DelayLine::new(capacity);
        self.delay_samples = ms_to_samples(self.parameters.delay_ms, sample_rate);
    }

    /// Silence the line without touching its size.
    pub fn flush(&mut self) {
        self.delay_line.flush();
    }

    #[allow(dead_code)]
    pub fn parameters(&self) -> ModulatedDelayParameters {
        self.parameters
    }

    pub fn set_parameters(&mut self, parameters: ModulatedDelayParameters) {
        if parameters.dry_level_db != self.parameters.dry_level_db {
            self.dry_gain = util::db_to_gain(parameters.dry_level_db);
        }
        if parameters.wet_level_db != self.parameters.wet_level_db {
            self.wet_gain = util::db_to_gain(parameters.wet_level_db);
        }
        self.delay_samples = ms_to_samples(parameters.delay_ms, self.sample_rate);
        self.parameters = parameters;
    }

    /// Length of the allocated line in milliseconds.
    pub fn buffer_length_ms(&self) -> f32 {
        self.buffer_length_ms
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay_line.read(self.delay_samples);
        let feedback = self.parameters.feedback_pct / 100.0;
        self.delay_line.write(input + feedback * delayed);

        self.dry_gain * input + self.wet_gain * delayed
    }
}

/// Milliseconds to samples. Multiplying before dividing keeps whole
/// millisecond values exact at common sample rates.
pub(crate) fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Samples needed to hold `length_ms`, plus one slot for the fractional
/// read.
pub(crate) fn buffer_capacity(sample_rate: f32, length_ms: f32) -> NonZeroUsize {
    let samples = ms_to_samples(length_ms, sample_rate).max(0.0) as usize + 1;
    NonZeroUsize::new(samples).unwrap_or(NonZeroUsize::MIN)
}
