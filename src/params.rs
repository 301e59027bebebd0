//! # Plugin Parameters
//!
//! Every knob and switch the host sees. The string IDs in `#[id = "..."]`
//! are what presets and automation are stored against, so they must never
//! change once published.
//!
//! None of these parameters are smoothed. The engine takes a fresh
//! snapshot once per block, and a tap-time jump is meant to be heard as a
//! jump.

use nih_plug::prelude::*;

use crate::dsp::four_tap::{ModType, Parameters};

#[derive(Params)]
pub struct PluginParams {
    /// **Short Delay**: the base increment for "short" taps.
    #[id = "dly_short"]
    pub delay_time_short: FloatParam,

    /// **Long Delay**: the base increment for "long" taps.
    #[id = "dly_long"]
    pub delay_time_long: FloatParam,

    /// **Feedback** into the multi-tap bus, or into the flanger tap.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Blend** between dry and the averaged taps.
    #[id = "blend"]
    pub blend: FloatParam,

    /// **Mode** picks one of the 14 tap topologies. Modes 1 and 2 also
    /// accept modulation.
    #[id = "mode"]
    pub mode: IntParam,

    /// **Modulation** type for modes 1 and 2.
    #[id = "mod_type"]
    pub mod_type: EnumParam<ModType>,

    #[id = "mod_depth"]
    pub mod_depth: FloatParam,

    #[id = "mod_rate"]
    pub mod_rate: FloatParam,

    #[id = "mod_on"]
    pub enable_mod: BoolParam,

    /// **Sidechain**: let the sidechain level set the modulation depth.
    #[id = "sc_on"]
    pub enable_sidechain: BoolParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            delay_time_short: FloatParam::new(
                "Short Delay Time",
                200.0,
                FloatRange::Linear {
                    min: 1.0,
                    max: 400.0,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.1),

            delay_time_long: FloatParam::new(
                "Long Delay Time",
                400.0,
                FloatRange::Linear {
                    min: 200.0,
                    max: 1000.0,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.1),

            feedback: FloatParam::new(
                "Feedback",
                0.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: 100.0,
                },
            )
            .with_unit(" %")
            .with_step_size(0.1),

            blend: FloatParam::new("Blend", 0.5, FloatRange::Linear { min: 0.0, max: 1.0 })
                .with_value_to_string(formatters::v2s_f32_percentage(1))
                .with_string_to_value(formatters::s2v_f32_percentage())
                .with_unit("%"),

            mode: IntParam::new("Mode Selector", 1, IntRange::Linear { min: 1, max: 14 }),

            mod_type: EnumParam::new("Modulation", ModType::Flanger),

            mod_depth: FloatParam::new(
                "Mod Depth",
                0.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: 100.0,
                },
            )
            .with_unit(" %")
            .with_step_size(0.1),

            mod_rate: FloatParam::new(
                "Mod Rate",
                0.2,
                FloatRange::Skewed {
                    min: 0.2,
                    max: 20.0,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(0.01),

            enable_mod: BoolParam::new("Enable Mod", false),

            enable_sidechain: BoolParam::new("Enable Sidechain", false),
        }
    }
}

impl PluginParams {
    /// Snapshot the current values as engine parameters.
    pub fn engine_parameters(&self) -> Parameters {
        Parameters {
            feedback_pct: self.feedback.value(),
            blend: self.blend.value(),
            mode_selector_value: self.mode.value().clamp(1, 14) as u32,
            delay_time_short_ms: self.delay_time_short.value(),
            delay_time_long_ms: self.delay_time_long.value(),
            mod_depth_pct: self.mod_depth.value(),
            mod_rate_hz: self.mod_rate.value(),
            mod_type: self.mod_type.value(),
            enable_mod: self.enable_mod.value(),
            enable_sidechain: self.enable_sidechain.value(),
        }
    }
}
