//! # Low Frequency Oscillator
//!
//! A phase-accumulator LFO that drives the modulated tap's delay time.
//! Every call returns the same sample in two forms:
//!
//! - **bipolar**, swinging -1.0 to +1.0, for modulation centred on a value
//!   (vibrato, chorus)
//! - **unipolar**, swinging 0.0 to 1.0, for modulation that only moves up
//!   from a floor (flanger)
//!
//! ```text
//! unipolar = (bipolar + 1.0) * 0.5
//! ```

use std::f32::consts::TAU;

use super::modulation::bipolar_to_unipolar;

/// LFO waveform shapes. The engine sweeps with the triangle.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoWaveform {
    Sine,
    /// Linear ramps from -1 up to +1 and back. Starts at -1.
    Triangle,
    /// Rising ramp from -1 to +1, then a jump back.
    Saw,
}

/// One LFO sample in both polarities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoOutput {
    pub bipolar: f32,
    pub unipolar: f32,
}

#[derive(Debug, Clone)]
pub struct Lfo {
    waveform: LfoWaveform,
    frequency_hz: f32,
    sample_rate: f32,
    /// Current phase in cycles, `[0, 1)`.
    phase: f32,
    phase_inc: f32,
}

impl Lfo {
    pub fn new(waveform: LfoWaveform, sample_rate: f32) -> Self {
        let mut lfo = Self {
            waveform,
            frequency_hz: 1.0,
            sample_rate,
            phase: 0.0,
            phase_inc: 0.0,
        };
        lfo.update_increment();
        lfo
    }

    /// Rewind to phase zero and adopt a new sample rate.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
        self.update_increment();
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz;
        self.update_increment();
    }

    #[allow(dead_code)]
    pub fn frequency(&self) -> f32 {
        self.frequency_hz
    }

    /// Switch shape without disturbing the phase.
    #[allow(dead_code)]
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    fn update_increment(&mut self) {
        self.phase_inc = if self.sample_rate > 0.0 {
            self.frequency_hz / self.sample_rate
        } else {
            0.0
        };
    }

    /// Produce the sample at the current phase, then advance by one sample.
    pub fn render(&mut self) -> LfoOutput {
        let phase = self.phase;
        let bipolar = match self.waveform {
            LfoWaveform::Sine => (phase * TAU).sin(),
            LfoWaveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            LfoWaveform::Saw => 2.0 * phase - 1.0,
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        LfoOutput {
            bipolar,
            unipolar: bipolar_to_unipolar(bipolar),
        }
    }
}
