//! # Four-Tap Delay Engine
//!
//! One instance processes one channel. Each sample takes one of two
//! paths, chosen from the current parameters:
//!
//! ```text
//!                      enable_mod && mode ∈ {1, 2} ?
//!                     /                            \
//!                   no                             yes
//!                   /                                \
//!   STATIC MULTI-TAP                          MODULATED TAP
//!
//!   Input ─┬─►(+)─► [12 s line] ─┬─ tap 0 ─┐   Input ─► [ModulatedDelay] ─► Output
//!          │   ▲                 ├─ tap 1 ─┤                  ▲
//!          │   │                 ├─ tap 2 ─┤            LFO × depth
//!          │   │                 └─ tap 3 ─┤          (or sidechain level)
//!          │   └── Σ tap × weight × fb ◄───┤
//!          │                               ▼
//!          └── × (1 - blend) ──►(+)◄── Σ taps / 4 × blend
//!                                │
//!                                ▼
//!                              Output
//! ```
//!
//! The tap average always divides by four, even when fewer taps are
//! active, so single-tap modes come out 12 dB down.

use std::num::NonZeroUsize;

use nih_plug::prelude::Enum;
use nih_plug::{nih_debug_assert, util};

use super::delay_line::DelayLine;
use super::envelope::{DetectMode, EnvelopeFollower, EnvelopeSettings};
use super::lfo::{Lfo, LfoOutput, LfoWaveform};
use super::mod_delay::{buffer_capacity, ms_to_samples, ModulatedDelay, ModulatedDelayParameters};
use super::modulation::{bipolar_modulation, unipolar_modulation_from_min};
use super::taps::{self, TapSchedule, MAX_TAPS};

/// Feedback contribution of each tap, earliest tap weighted least.
pub const FEEDBACK_WEIGHTS: [f32; MAX_TAPS] = [0.05, 0.10, 0.25, 0.60];

/// Length of the static multi-tap line. Covers the longest topology.
const STATIC_BUFFER_LENGTH_MS: f32 = 12_000.0;
/// Length of the modulated tap's line.
const MOD_BUFFER_LENGTH_MS: f32 = 100.0;

/// Lowest modulated delay, indexed `[mode - 1][mod type]`.
const MOD_MIN_DELAY_MS: [[f32; 3]; 2] = [[1.0, 0.0, 4.0], [1.0, 0.0, 16.0]];
/// Sweep width above the minimum, indexed `[mode - 1][mod type]`.
const MOD_DEPTH_RANGE_MS: [[f32; 3]; 2] = [[4.0, 5.0, 8.0], [6.0, 7.0, 24.0]];
/// Modulated tap levels, indexed by mod type.
const MOD_WET_DB: [f32; 3] = [-3.0, 0.0, -3.0];
const MOD_DRY_DB: [f32; 3] = [-3.0, -96.0, 0.0];

/// Sidechain levels map onto this depth range.
const SIDECHAIN_DEPTH_MIN: f32 = 0.2;
const SIDECHAIN_DEPTH_MAX: f32 = 1.0;

const SIDECHAIN_DETECTOR: EnvelopeSettings = EnvelopeSettings {
    attack_ms: 1.0,
    release_ms: 500.0,
    detect_mode: DetectMode::Rms,
    detect_db: true,
    clamp_to_unity: false,
};

/// Character of the modulated tap.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModType {
    #[id = "flanger"]
    Flanger,
    #[id = "vibrato"]
    Vibrato,
    #[id = "chorus"]
    Chorus,
}

impl ModType {
    /// Column in the per-type lookup tables.
    const fn index(self) -> usize {
        match self {
            ModType::Flanger => 0,
            ModType::Vibrato => 1,
            ModType::Chorus => 2,
        }
    }
}

/// Engine parameters. Replaced wholesale by [`FourTapDelay::set_parameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    /// Feedback into the static bus (or the flanger tap), 0–100.
    pub feedback_pct: f32,
    /// Wet share of the static path, 0–1.
    pub blend: f32,
    /// Tap topology, 1–14.
    pub mode_selector_value: u32,
    pub delay_time_short_ms: f32,
    pub delay_time_long_ms: f32,
    /// Modulation excursion, 0–100.
    pub mod_depth_pct: f32,
    pub mod_rate_hz: f32,
    pub mod_type: ModType,
    pub enable_mod: bool,
    /// Let the sidechain level replace the modulation depth.
    pub enable_sidechain: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            feedback_pct: 0.0,
            blend: 0.5,
            mode_selector_value: 1,
            delay_time_short_ms: 200.0,
            delay_time_long_ms: 400.0,
            mod_depth_pct: 0.0,
            mod_rate_hz: 0.2,
            mod_type: ModType::Flanger,
            enable_mod: false,
            enable_sidechain: false,
        }
    }
}

/// Which algorithm a `process` call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessPath {
    StaticMultiTap,
    /// `topology` is `mode - 1`, a row of the modulation tables.
    ModulatedTap { topology: usize },
}

impl ProcessPath {
    fn select(parameters: &Parameters) -> Self {
        match parameters.mode_selector_value {
            mode @ 1..=2 if parameters.enable_mod => Self::ModulatedTap {
                topology: mode as usize - 1,
            },
            _ => Self::StaticMultiTap,
        }
    }
}

/// Mean of the four tap outputs. Inactive taps count as zeros.
pub fn tap_average(taps: &[f32; MAX_TAPS]) -> f32 {
    taps.iter().sum::<f32>() / MAX_TAPS as f32
}

/// Tap outputs weighted by [`FEEDBACK_WEIGHTS`].
pub fn weighted_feedback(taps: &[f32; MAX_TAPS]) -> f32 {
    taps.iter()
        .zip(FEEDBACK_WEIGHTS)
        .map(|(tap, weight)| tap * weight)
        .sum()
}

/// Modulation depth for `parameters`. A sidechain depth, when present,
/// replaces the knob entirely.
pub fn resolve_depth(parameters: &Parameters, sidechain_depth: Option<f32>) -> f32 {
    if let Some(depth) = sidechain_depth {
        return depth;
    }
    let depth = parameters.mod_depth_pct / 200.0;
    match parameters.mod_type {
        ModType::Flanger => depth * 2.0,
        ModType::Vibrato | ModType::Chorus => depth,
    }
}

/// Delay time of the modulated tap for one LFO sample.
///
/// Flanger sweeps up from its minimum; vibrato and chorus swing around the
/// centre of their range.
pub fn modulated_delay_ms(mod_type: ModType, topology: usize, lfo: LfoOutput, depth: f32) -> f32 {
    let min = MOD_MIN_DELAY_MS[topology][mod_type.index()];
    let max = min + MOD_DEPTH_RANGE_MS[topology][mod_type.index()];
    match mod_type {
        ModType::Flanger => unipolar_modulation_from_min(lfo.unipolar * depth, min, max),
        ModType::Vibrato | ModType::Chorus => bipolar_modulation(lfo.bipolar * depth, min, max),
    }
}

/// Map a detector level in dB onto the sidechain depth range.
fn sidechain_depth_from_db(level_db: f32) -> f32 {
    unipolar_modulation_from_min(
        util::db_to_gain(level_db),
        SIDECHAIN_DEPTH_MIN,
        SIDECHAIN_DEPTH_MAX,
    )
}

/// Echo tail for a loop that repeats every `period_samples` with
/// `loop_gain` per pass: repeats until -60 dB. `None` if it never decays.
fn decay_tail(period_samples: f32, loop_gain: f32) -> Option<u32> {
    // The four weights sum to one only up to rounding.
    if loop_gain >= 1.0 - 1e-6 {
        return None;
    }
    if loop_gain > 0.001 {
        let repeats = -3.0 / loop_gain.log10(); // log10(0.001) = -3
        Some((repeats * period_samples) as u32)
    } else {
        Some(period_samples as u32)
    }
}

/// The per-channel delay engine.
#[derive(Debug, Clone)]
pub struct FourTapDelay {
    parameters: Parameters,
    /// 0 until the first [`reset`](Self::reset).
    sample_rate: f32,

    delay_line: DelayLine,
    tap_times_ms: [f32; MAX_TAPS],
    tap_delay_samples: [f32; MAX_TAPS],
    active_taps: usize,

    mod_delay: ModulatedDelay,
    lfo: Lfo,

    detector: EnvelopeFollower,
    sidechain_sample: f32,
    sidechain_depth: f32,
}

impl Default for FourTapDelay {
    fn default() -> Self {
        let mut detector = EnvelopeFollower::new(0.0);
        detector.set_settings(SIDECHAIN_DETECTOR);

        let mut engine = Self {
            parameters: Parameters::default(),
            sample_rate: 0.0,
            delay_line: DelayLine::new(NonZeroUsize::MIN),
            tap_times_ms: [0.0; MAX_TAPS],
            tap_delay_samples: [0.0; MAX_TAPS],
            active_taps: 0,
            mod_delay: ModulatedDelay::default(),
            lfo: Lfo::new(LfoWaveform::Triangle, 0.0),
            detector,
            sidechain_sample: 0.0,
            sidechain_depth: SIDECHAIN_DEPTH_MIN,
        };
        engine.set_parameters(Parameters::default());
        engine
    }
}

impl FourTapDelay {
    /// Prepare for a run at `sample_rate`.
    ///
    /// A new rate reallocates both delay lines. The same rate only flushes
    /// them and rewinds the LFO and detector, so it is safe to call from the
    /// audio thread. Returns `false` for a rate the engine cannot run at.
    pub fn reset(&mut self, sample_rate: f32) -> bool {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return false;
        }

        if sample_rate == self.sample_rate {
            self.delay_line.flush();
            self.mod_delay.flush();
        } else {
            self.sample_rate = sample_rate;
            self.delay_line = DelayLine::new(buffer_capacity(sample_rate, STATIC_BUFFER_LENGTH_MS));
            self.mod_delay
                .create_delay_buffer(sample_rate, MOD_BUFFER_LENGTH_MS);
            self.update_tap_delays();
        }

        self.lfo.reset(sample_rate);
        self.detector.reset(sample_rate);
        self.sidechain_sample = 0.0;
        self.sidechain_depth = SIDECHAIN_DEPTH_MIN;
        true
    }

    pub fn get_parameters(&self) -> Parameters {
        self.parameters
    }

    /// Replace all parameters and re-resolve the tap times.
    pub fn set_parameters(&mut self, parameters: Parameters) {
        let schedule = taps::schedule(parameters.mode_selector_value);
        nih_debug_assert!(
            schedule.is_some(),
            "mode selector {} is outside 1..=14",
            parameters.mode_selector_value
        );

        self.parameters = parameters;
        self.tap_times_ms = taps::resolve(
            parameters.mode_selector_value,
            parameters.delay_time_short_ms,
            parameters.delay_time_long_ms,
        );
        self.active_taps = schedule.map_or(0, TapSchedule::tap_count);
        self.update_tap_delays();
        self.lfo.set_frequency(parameters.mod_rate_hz);
    }

    fn update_tap_delays(&mut self) {
        for (samples, ms) in self.tap_delay_samples.iter_mut().zip(self.tap_times_ms) {
            *samples = ms_to_samples(ms, self.sample_rate);
        }
        nih_debug_assert!(
            self.tap_delay_samples
                .iter()
                .all(|delay| *delay < self.delay_line.capacity() as f32),
            "tap times {:?} exceed the delay line",
            self.tap_times_ms
        );
    }

    /// Turn the sidechain depth override on or off.
    pub fn enable_aux_input(&mut self, enable: bool) {
        self.parameters.enable_sidechain = enable;
    }

    /// Hand over the sidechain sample for the next [`process`](Self::process)
    /// call.
    pub fn process_aux_input(&mut self, sample: f32) -> f32 {
        self.sidechain_sample = sample;
        sample
    }

    /// The depth the modulated path uses right now.
    pub fn modulation_depth(&self) -> f32 {
        let sidechain = self
            .parameters
            .enable_sidechain
            .then_some(self.sidechain_depth);
        resolve_depth(&self.parameters, sidechain)
    }

    /// Tap times in milliseconds for the current mode. Inactive taps are 0.
    pub fn tap_times_ms(&self) -> [f32; MAX_TAPS] {
        self.tap_times_ms
    }

    /// How long the output keeps ringing after the input stops, in samples.
    /// `None` when the feedback never lets it decay, which on the multi-tap
    /// path takes full feedback with all four taps active.
    pub fn tail_samples(&self) -> Option<u32> {
        let feedback = self.parameters.feedback_pct / 100.0;
        match ProcessPath::select(&self.parameters) {
            ProcessPath::StaticMultiTap => {
                let longest = self.tap_delay_samples[..self.active_taps]
                    .iter()
                    .fold(0.0_f32, |longest, delay| longest.max(*delay));
                // Only the active taps' weights recirculate.
                let loop_gain =
                    feedback * FEEDBACK_WEIGHTS[..self.active_taps].iter().sum::<f32>();
                decay_tail(longest, loop_gain)
            }
            ProcessPath::ModulatedTap { .. } => {
                let loop_gain = match self.parameters.mod_type {
                    ModType::Flanger => feedback,
                    ModType::Vibrato | ModType::Chorus => 0.0,
                };
                let period = ms_to_samples(self.mod_delay.buffer_length_ms(), self.sample_rate);
                decay_tail(period, loop_gain)
            }
        }
    }

    /// Process one sample.
    pub fn process(&mut self, input: f32) -> f32 {
        // The detector runs on both paths so its envelope stays continuous
        // across mode switches.
        if self.parameters.enable_sidechain {
            let level_db = self.detector.process(self.sidechain_sample);
            self.sidechain_depth = sidechain_depth_from_db(level_db);
        }

        match ProcessPath::select(&self.parameters) {
            ProcessPath::StaticMultiTap => self.process_static(input),
            ProcessPath::ModulatedTap { topology } => self.process_modulated(input, topology),
        }
    }

    fn process_static(&mut self, input: f32) -> f32 {
        // Step 1: READ every active tap. Inactive taps stay at zero.
        let mut taps = [0.0; MAX_TAPS];
        for (tap, delay) in taps
            .iter_mut()
            .zip(self.tap_delay_samples)
            .take(self.active_taps)
        {
            *tap = self.delay_line.read(delay);
        }

        // Step 2: WEIGHT the taps into one feedback signal. Later taps
        // count for more.
        let feedback = self.parameters.feedback_pct / 100.0 * weighted_feedback(&taps);

        // Step 3: WRITE the input plus feedback into the line.
        self.delay_line.write(input + feedback);

        // Step 4: BLEND the tap average against the dry input.
        let blend = self.parameters.blend;
        blend * tap_average(&taps) + (1.0 - blend) * input
    }

    fn process_modulated(&mut self, input: f32, topology: usize) -> f32 {
        // Step 1: DEPTH comes from the knob, or from the sidechain level.
        let mod_type = self.parameters.mod_type;
        let depth = self.modulation_depth();

        // Step 2: SWEEP the tap's delay time with the next LFO sample.
        let lfo = self.lfo.render();

        // Step 3: SET the tap for this sample. Only the flanger keeps its
        // feedback; the levels are fixed per type.
        let feedback_pct = match mod_type {
            ModType::Flanger => self.parameters.feedback_pct,
            ModType::Vibrato | ModType::Chorus => 0.0,
        };
        self.mod_delay.set_parameters(ModulatedDelayParameters {
            delay_ms: modulated_delay_ms(mod_type, topology, lfo, depth),
            dry_level_db: MOD_DRY_DB[mod_type.index()],
            wet_level_db: MOD_WET_DB[mod_type.index()],
            feedback_pct,
        });

        // Step 4: RUN the tap. It mixes its own dry and wet.
        self.mod_delay.process(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// At 1 kHz one millisecond is one sample.
    const SAMPLE_RATE: f32 = 1000.0;

    fn engine(parameters: Parameters) -> FourTapDelay {
        let mut engine = FourTapDelay::default();
        assert!(engine.reset(SAMPLE_RATE));
        engine.set_parameters(parameters);
        engine
    }

    fn run_impulse(engine: &mut FourTapDelay, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| engine.process(if n == 0 { 1.0 } else { 0.0 }))
            .collect()
    }

    fn lfo_sample(bipolar: f32) -> LfoOutput {
        LfoOutput {
            bipolar,
            unipolar: (bipolar + 1.0) * 0.5,
        }
    }

    /// All four weights together pass the full feedback.
    #[test]
    fn test_feedback_weights_sum_to_one() {
        let sum: f32 = FEEDBACK_WEIGHTS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "Weights sum to {sum}");
    }

    /// Weighted sum of hand-picked tap values.
    #[test]
    fn test_weighted_feedback_of_known_taps() {
        let result = weighted_feedback(&[1.0, 2.0, 3.0, 4.0]);
        // 0.05 + 0.2 + 0.75 + 2.4
        assert!((result - 3.4).abs() < 1e-5, "Expected 3.4, got {result}");
    }

    /// A single tap still divides by four.
    #[test]
    fn test_tap_average_always_divides_by_four() {
        assert!((tap_average(&[0.8, 0.0, 0.0, 0.0]) - 0.2).abs() < 1e-6);

        // One active tap, fully wet: the echo comes out at a quarter.
        let mut engine = engine(Parameters {
            mode_selector_value: 1,
            delay_time_short_ms: 10.0,
            blend: 1.0,
            ..Parameters::default()
        });
        let out = run_impulse(&mut engine, 30);
        assert!((out[10] - 0.25).abs() < 1e-6, "Expected 0.25, got {}", out[10]);
    }

    /// Full blend outputs only the tap average.
    #[test]
    fn test_blend_one_is_tap_average() {
        // Mode 3 chains two short taps: 10 ms and 20 ms.
        let mut engine = engine(Parameters {
            mode_selector_value: 3,
            delay_time_short_ms: 10.0,
            blend: 1.0,
            ..Parameters::default()
        });

        let out = run_impulse(&mut engine, 40);
        for (n, sample) in out.iter().enumerate() {
            let expected = if n == 10 || n == 20 { 0.25 } else { 0.0 };
            assert!(
                (sample - expected).abs() < 1e-6,
                "sample {n}: expected {expected}, got {sample}"
            );
        }
    }

    /// Zero blend outputs the dry input for every mode.
    #[test]
    fn test_blend_zero_is_dry() {
        for mode in 1..=14 {
            let mut engine = engine(Parameters {
                mode_selector_value: mode,
                delay_time_short_ms: 3.0,
                delay_time_long_ms: 7.0,
                feedback_pct: 80.0,
                blend: 0.0,
                ..Parameters::default()
            });

            for n in 0..200 {
                let input = ((n * 37) % 11) as f32 / 11.0 - 0.5;
                let output = engine.process(input);
                assert_eq!(output, input, "mode {mode}, sample {n}");
            }
        }
    }

    /// Feedback is scaled by the tap weight before it re-enters.
    #[test]
    fn test_feedback_goes_through_tap_weight() {
        let mut engine = engine(Parameters {
            mode_selector_value: 1,
            delay_time_short_ms: 10.0,
            feedback_pct: 100.0,
            blend: 1.0,
            ..Parameters::default()
        });

        let out = run_impulse(&mut engine, 30);
        // Tap 0 feeds back with weight 0.05, then averages over four.
        let expected = FEEDBACK_WEIGHTS[0] / 4.0;
        assert!(
            (out[20] - expected).abs() < 1e-6,
            "Expected {expected}, got {}",
            out[20]
        );
    }

    /// 200 ms at 44.1 kHz is 8820 samples. Half the output is dry, and the
    /// single tap is averaged over four.
    #[test]
    fn test_impulse_end_to_end() {
        let mut engine = FourTapDelay::default();
        assert!(engine.reset(44100.0));
        engine.set_parameters(Parameters {
            mode_selector_value: 1,
            delay_time_short_ms: 200.0,
            feedback_pct: 0.0,
            blend: 0.5,
            ..Parameters::default()
        });

        let out = run_impulse(&mut engine, 9000);
        assert!((out[0] - 0.5).abs() < 1e-6, "Dry impulse: {}", out[0]);
        assert!(
            (out[8820] - 0.25 * 1.0 * 0.5).abs() < 1e-6,
            "Echo: {}",
            out[8820]
        );
        assert!(out[1..8820].iter().all(|s| s.abs() < 1e-6));
        assert!(out[8821..].iter().all(|s| s.abs() < 1e-6));
    }

    /// A flanger at zero depth holds its minimum delay.
    #[test]
    fn test_flanger_zero_depth_sits_at_min_delay() {
        for topology in 0..2 {
            for bipolar in [-1.0, -0.3, 0.0, 0.6, 1.0] {
                let delay = modulated_delay_ms(ModType::Flanger, topology, lfo_sample(bipolar), 0.0);
                assert_eq!(delay, MOD_MIN_DELAY_MS[topology][0]);
            }
        }

        let mut engine = engine(Parameters {
            mode_selector_value: 2,
            enable_mod: true,
            mod_type: ModType::Flanger,
            mod_depth_pct: 0.0,
            mod_rate_hz: 5.0,
            ..Parameters::default()
        });
        for _ in 0..50 {
            engine.process(0.1);
            assert_eq!(engine.mod_delay.parameters().delay_ms, 1.0);
        }
    }

    /// A flanger at full depth sweeps to the top of its range.
    #[test]
    fn test_flanger_full_depth_reaches_max_delay() {
        let delay = modulated_delay_ms(ModType::Flanger, 1, lfo_sample(1.0), 1.0);
        assert!((delay - 7.0).abs() < 1e-6, "Expected 7 ms, got {delay}");
    }

    /// Vibrato and chorus swing around the middle of their range.
    #[test]
    fn test_bipolar_types_centre_on_their_range() {
        let chorus = modulated_delay_ms(ModType::Chorus, 1, lfo_sample(0.7), 0.0);
        assert_eq!(chorus, 28.0);

        let vibrato = modulated_delay_ms(ModType::Vibrato, 0, lfo_sample(-1.0), 0.5);
        // Centre 2.5 ms, half-range 2.5 ms, swing -0.5.
        assert!((vibrato - 1.25).abs() < 1e-6, "Expected 1.25, got {vibrato}");
    }

    /// Depth is the knob percent over 200, doubled for the flanger.
    #[test]
    fn test_depth_from_parameters() {
        let flanger = Parameters {
            mod_depth_pct: 50.0,
            mod_type: ModType::Flanger,
            ..Parameters::default()
        };
        let chorus = Parameters {
            mod_type: ModType::Chorus,
            ..flanger
        };
        assert!((resolve_depth(&flanger, None) - 0.5).abs() < 1e-6);
        assert!((resolve_depth(&chorus, None) - 0.25).abs() < 1e-6);
    }

    /// With the sidechain on, only its level sets the depth.
    #[test]
    fn test_sidechain_depth_ignores_knob_and_type() {
        for mod_type in [ModType::Flanger, ModType::Vibrato, ModType::Chorus] {
            for mod_depth_pct in [0.0, 35.0, 100.0] {
                let parameters = Parameters {
                    mod_type,
                    mod_depth_pct,
                    ..Parameters::default()
                };
                assert_eq!(resolve_depth(&parameters, Some(0.6)), 0.6);
            }
        }

        let base = Parameters {
            mode_selector_value: 1,
            enable_mod: true,
            enable_sidechain: true,
            ..Parameters::default()
        };
        let mut a = engine(Parameters {
            mod_type: ModType::Flanger,
            mod_depth_pct: 10.0,
            ..base
        });
        let mut b = engine(Parameters {
            mod_type: ModType::Chorus,
            mod_depth_pct: 90.0,
            ..base
        });

        for n in 0..500 {
            let aux = if (n / 25) % 2 == 0 { 0.8 } else { -0.3 };
            a.process_aux_input(aux);
            b.process_aux_input(aux);
            a.process(0.0);
            b.process(0.0);

            let depth = a.modulation_depth();
            assert_eq!(depth, b.modulation_depth(), "sample {n}");
            assert!(
                (SIDECHAIN_DEPTH_MIN..=SIDECHAIN_DEPTH_MAX).contains(&depth),
                "depth {depth} out of the sidechain range"
            );
        }
        assert!(a.modulation_depth() > SIDECHAIN_DEPTH_MIN);
    }

    /// A silent sidechain leaves the depth at its floor.
    #[test]
    fn test_silent_sidechain_gives_floor_depth() {
        let mut engine = engine(Parameters {
            enable_sidechain: true,
            ..Parameters::default()
        });
        for _ in 0..100 {
            engine.process_aux_input(0.0);
            engine.process(0.0);
        }
        let depth = engine.modulation_depth();
        assert!(
            (depth - SIDECHAIN_DEPTH_MIN).abs() < 1e-4,
            "Expected the floor depth, got {depth}"
        );
    }

    /// Toggling the aux input switches between knob and sidechain depth.
    #[test]
    fn test_enable_aux_input_toggles_sidechain() {
        let mut engine = engine(Parameters {
            mod_depth_pct: 40.0,
            mod_type: ModType::Flanger,
            ..Parameters::default()
        });
        assert!((engine.modulation_depth() - 0.4).abs() < 1e-6);

        engine.enable_aux_input(true);
        assert!(engine.get_parameters().enable_sidechain);
        assert_eq!(engine.modulation_depth(), SIDECHAIN_DEPTH_MIN);

        engine.enable_aux_input(false);
        assert!((engine.modulation_depth() - 0.4).abs() < 1e-6);
    }

    /// Vibrato is wet only and never recirculates.
    #[test]
    fn test_vibrato_path_is_fully_wet_without_feedback() {
        // Depth 0 parks vibrato in the middle of 0–5 ms: a 2.5 sample delay
        // that splits the impulse across two samples.
        let mut engine = engine(Parameters {
            mode_selector_value: 1,
            enable_mod: true,
            mod_type: ModType::Vibrato,
            mod_depth_pct: 0.0,
            feedback_pct: 80.0,
            ..Parameters::default()
        });

        let out = run_impulse(&mut engine, 30);
        assert!((out[2] - 0.5).abs() < 1e-6, "got {}", out[2]);
        assert!((out[3] - 0.5).abs() < 1e-6, "got {}", out[3]);
        for (n, sample) in out.iter().enumerate().skip(4) {
            assert!(sample.abs() < 1e-3, "Feedback leaked at {n}: {sample}");
        }
    }

    /// Modes above 2 ignore the modulation switch.
    #[test]
    fn test_modulation_bypassed_outside_modes_one_and_two() {
        for mode in 3..=14 {
            let parameters = Parameters {
                mode_selector_value: mode,
                delay_time_short_ms: 4.0,
                delay_time_long_ms: 9.0,
                feedback_pct: 30.0,
                mod_depth_pct: 70.0,
                ..Parameters::default()
            };
            assert_eq!(
                ProcessPath::select(&Parameters {
                    enable_mod: true,
                    ..parameters
                }),
                ProcessPath::StaticMultiTap
            );

            let mut plain = engine(parameters);
            let mut modulated = engine(Parameters {
                enable_mod: true,
                ..parameters
            });
            assert_eq!(run_impulse(&mut plain, 100), run_impulse(&mut modulated, 100));
        }
    }

    /// Which path each mode and switch combination runs.
    #[test]
    fn test_path_selection() {
        let on = Parameters {
            enable_mod: true,
            ..Parameters::default()
        };
        assert_eq!(
            ProcessPath::select(&Parameters {
                mode_selector_value: 1,
                ..on
            }),
            ProcessPath::ModulatedTap { topology: 0 }
        );
        assert_eq!(
            ProcessPath::select(&Parameters {
                mode_selector_value: 2,
                ..on
            }),
            ProcessPath::ModulatedTap { topology: 1 }
        );
        assert_eq!(
            ProcessPath::select(&Parameters::default()),
            ProcessPath::StaticMultiTap
        );
    }

    /// Setting the current parameters again changes nothing.
    #[test]
    fn test_set_get_round_trip() {
        let mut engine = engine(Parameters {
            mode_selector_value: 12,
            delay_time_short_ms: 120.0,
            delay_time_long_ms: 450.0,
            ..Parameters::default()
        });
        let taps = engine.tap_times_ms();
        let delays = engine.tap_delay_samples;
        let active = engine.active_taps;

        let snapshot = engine.get_parameters();
        engine.set_parameters(snapshot);

        assert_eq!(engine.get_parameters(), snapshot);
        assert_eq!(engine.tap_times_ms(), taps);
        assert_eq!(engine.tap_delay_samples, delays);
        assert_eq!(engine.active_taps, active);
    }

    /// Four 1000 ms taps fit in the static line.
    #[test]
    fn test_longest_topology_fits_buffer() {
        let engine = engine(Parameters {
            mode_selector_value: 14,
            delay_time_long_ms: 1000.0,
            ..Parameters::default()
        });
        assert_eq!(engine.tap_times_ms(), [1000.0, 2000.0, 3000.0, 4000.0]);
        assert!(engine
            .tap_delay_samples
            .iter()
            .all(|d| *d <= (engine.delay_line.capacity() - 1) as f32));
    }

    /// Resetting at the same rate flushes without reallocating.
    #[test]
    fn test_reset_same_rate_only_flushes() {
        let mut engine = engine(Parameters {
            mode_selector_value: 1,
            delay_time_short_ms: 10.0,
            blend: 1.0,
            ..Parameters::default()
        });
        let capacity = engine.delay_line.capacity();
        engine.process(1.0);

        assert!(engine.reset(SAMPLE_RATE));
        assert_eq!(engine.delay_line.capacity(), capacity);

        let out: Vec<f32> = (0..30).map(|_| engine.process(0.0)).collect();
        assert!(out.iter().all(|s| s.abs() < 1e-6), "Echo survived the reset");
    }

    /// A new sample rate resizes the static line.
    #[test]
    fn test_reset_new_rate_resizes() {
        let mut engine = engine(Parameters::default());
        assert_eq!(engine.delay_line.capacity(), 12_001);

        assert!(engine.reset(2000.0));
        assert_eq!(engine.delay_line.capacity(), 24_001);
        // Tap times are re-derived for the new rate.
        assert_eq!(engine.tap_delay_samples[0], 400.0);
    }

    /// Zero, negative and non-finite rates are refused.
    #[test]
    fn test_reset_rejects_unusable_rates() {
        let mut engine = FourTapDelay::default();
        assert!(!engine.reset(0.0));
        assert!(!engine.reset(-44100.0));
        assert!(!engine.reset(f32::NAN));
    }

    /// The tail grows with feedback and never ends when every tap recirculates.
    #[test]
    fn test_tail_estimates() {
        let mut engine = engine(Parameters {
            mode_selector_value: 14,
            delay_time_long_ms: 10.0,
            ..Parameters::default()
        });
        // Four long taps: the last one sits at 40 ms.
        assert_eq!(engine.tail_samples(), Some(40));

        engine.set_parameters(Parameters {
            feedback_pct: 10.0,
            ..engine.get_parameters()
        });
        // All four weights recirculate, so 10% per pass reaches -60 dB
        // after three passes of the longest tap.
        let tail = engine.tail_samples().unwrap();
        assert!((119..=121).contains(&tail), "Expected about 120, got {tail}");

        engine.set_parameters(Parameters {
            feedback_pct: 100.0,
            ..engine.get_parameters()
        });
        assert_eq!(engine.tail_samples(), None);
    }

    /// With fewer than four taps only their weights feed back, so even full
    /// feedback dies away.
    #[test]
    fn test_full_feedback_decays_with_fewer_taps() {
        let mut engine = engine(Parameters {
            mode_selector_value: 1,
            delay_time_short_ms: 10.0,
            feedback_pct: 100.0,
            blend: 1.0,
            ..Parameters::default()
        });

        // 5% per pass: -60 dB after log(0.001) / log(0.05) ≈ 2.3 passes.
        let tail = engine.tail_samples();
        assert!(
            matches!(tail, Some(22..=24)),
            "Expected about 23 samples, got {tail:?}"
        );

        // The echo really is gone by then.
        let out: Vec<f32> = (0..40)
            .map(|n| engine.process(if n == 0 { 1.0 } else { 0.0 }))
            .collect();
        assert!(out[30..].iter().all(|s| s.abs() < 1e-3));

        for mode in 10..=13 {
            engine.set_parameters(Parameters {
                mode_selector_value: mode,
                ..engine.get_parameters()
            });
            assert_eq!(engine.tail_samples(), None, "mode {mode}");
        }
    }
}
