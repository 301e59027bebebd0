//! # Four Tap Delay: An AU/VST3/CLAP Multi-Tap Delay Plugin
//!
//! A four-tap delay with 14 tap topologies, built with
//! [nih-plug](https://github.com/robbert-vdh/nih-plug). Modes 1 and 2 can
//! swap the tap bus for a single LFO-swept tap (flanger, vibrato or
//! chorus), whose depth can in turn follow the level of a sidechain input.
//! Outputs Audio Unit (AUv2), VST3, and CLAP formats from a single codebase.
//!
//! ## Signal Flow
//!
//! ```text
//!                    Sidechain ──► [RMS Detector] ──► depth
//!                                                       │
//! Input ──┬──► mode 1/2 with mod on? ──yes──► [Modulated Tap] ──► Output
//!         │               │                      ▲
//!         │               no                   [LFO]
//!         │               ▼
//!         │    ┌──►(+)──► [Delay Line] ──► tap 0..3 ──┐
//!         │    │                                     │
//!         │    └──── Σ tap × weight × feedback ◄─────┤
//!         │                                          ▼
//!         └──── × (1 - blend) ──────────►(+)◄── Σ taps / 4 × blend
//!                                         │
//!                                         ▼
//!                                       Output
//! ```
//!
//! Each channel runs its own [`FourTapDelay`](dsp::four_tap::FourTapDelay).

mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::four_tap::{FourTapDelay, Parameters};
use nih_plug::prelude::*;
use params::PluginParams;

/// The main plugin struct.
///
/// Parameters are shared with the host through the `Arc`. The engines are
/// owned by the audio thread and only touched from `initialize()`,
/// `reset()` and `process()`.
struct FourTapDelayPlugin {
    params: Arc<PluginParams>,

    /// Set in `initialize()`. `reset()` hands the same rate back to the
    /// engines so they flush instead of reallocating.
    sample_rate: f32,

    /// One engine per main channel.
    engines: Vec<FourTapDelay>,
}

impl Default for FourTapDelayPlugin {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            sample_rate: 44100.0,
            // Populated in initialize() once the channel count is known.
            engines: Vec::new(),
        }
    }
}

impl Plugin for FourTapDelayPlugin {
    const NAME: &'static str = "Four Tap Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The host picks the first layout matching the track. Each layout
    // carries a sidechain with as many channels as the main bus.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[new_nonzero_u32(2)],
            aux_output_ports: &[],
            names: PortNames {
                aux_inputs: &["Sidechain"],
                ..PortNames::const_default()
            },
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[new_nonzero_u32(1)],
            aux_output_ports: &[],
            names: PortNames {
                aux_inputs: &["Sidechain"],
                ..PortNames::const_default()
            },
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Size one engine per channel for the host's sample rate. This is the
    /// only place the delay lines are allocated.
    ///
    /// Returns `false` if an engine rejects the sample rate, which tells the
    /// host this configuration can't be used.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        let num_channels = audio_io_layout
            .main_input_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);

        nih_log!(
            "initializing {} channel(s) at {} Hz",
            num_channels,
            self.sample_rate
        );

        self.engines.resize_with(num_channels, FourTapDelay::default);

        let parameters = self.params.engine_parameters();
        for engine in &mut self.engines {
            engine.set_parameters(parameters);
            if !engine.reset(self.sample_rate) {
                nih_log!("unsupported sample rate {}", self.sample_rate);
                return false;
            }
        }

        if let Some(engine) = self.engines.first() {
            nih_log!(
                "mode {} taps at {:?} ms",
                parameters.mode_selector_value,
                engine.tap_times_ms()
            );
        }

        true
    }

    /// Called when playback stops or the plugin is bypassed. The sample
    /// rate is unchanged, so the engines only flush their lines.
    fn reset(&mut self) {
        for engine in &mut self.engines {
            engine.reset(self.sample_rate);
        }
    }

    /// Parameters are read once per block. An engine re-resolves its tap
    /// times only when the snapshot differs from what it already has.
    ///
    /// Per sample and channel, the matching sidechain sample is handed to
    /// the engine before the main input. A mono sidechain feeds every
    /// channel.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let sidechain = aux.inputs.first().map(|bus| bus.as_slice_immutable());

        // ─── Step 1: SNAPSHOT the parameters for this block ───
        //
        // Without a sidechain bus the depth knob stays in charge, whatever
        // the sidechain switch says.
        let parameters = self.params.engine_parameters();
        let sidechain_on = parameters.enable_sidechain && sidechain.is_some();
        let expected = Parameters {
            enable_sidechain: sidechain_on,
            ..parameters
        };
        for engine in &mut self.engines {
            if engine.get_parameters() != expected {
                engine.set_parameters(parameters);
                engine.enable_aux_input(sidechain_on);
            }
        }

        for (sample_idx, mut channel_samples) in buffer.iter_samples().enumerate() {
            for (channel_idx, sample) in channel_samples.iter_mut().enumerate() {
                let Some(engine) = self.engines.get_mut(channel_idx) else {
                    continue;
                };

                // Step 2: FEED the sidechain sample for this channel. A mono
                // sidechain falls back to its only channel; no bus means
                // silence.
                let aux_sample = sidechain
                    .and_then(|channels| channels.get(channel_idx).or_else(|| channels.first()))
                    .and_then(|channel| channel.get(sample_idx))
                    .copied()
                    .unwrap_or(0.0);
                engine.process_aux_input(aux_sample);

                // Step 3: PROCESS the main sample in place. The engine picks
                // the multi-tap or the modulated path itself.
                *sample = engine.process(*sample);
            }
        }

        // Step 4: REPORT the tail. The longest one wins, and any engine
        // that never decays keeps the plugin alive.
        let mut tail_samples = 0;
        for engine in &self.engines {
            match engine.tail_samples() {
                Some(samples) => tail_samples = tail_samples.max(samples),
                None => return ProcessStatus::KeepAlive,
            }
        }

        ProcessStatus::Tail(tail_samples)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for FourTapDelayPlugin {
    const CLAP_ID: &'static str = "com.loveless-audio.four-tap-delay-v1";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A four-tap delay with flanger, vibrato and chorus modes");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
        ClapFeature::Flanger,
        ClapFeature::Chorus,
    ];
}

impl Vst3Plugin for FourTapDelayPlugin {
    // `*b"..."` turns the 16-character ASCII literal into a `[u8; 16]`.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssFourTap_v01";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Modulation,
    ];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// On macOS, clap_wrapper adds a `GetPluginFactoryAUV2` entry point so the
// CLAP build also loads as an Audio Unit.

nih_export_clap!(FourTapDelayPlugin);
nih_export_vst3!(FourTapDelayPlugin);

#[cfg(target_os = "macos")]
clap_wrapper::export_auv2!();
