//! # DSP
//!
//! The building blocks of the four-tap delay, leaves first:
//!
//! - **`delay_line`**: ring buffer with a fractional, interpolated read.
//! - **`envelope`**: attack/release level detector for the sidechain.
//! - **`lfo`**: the oscillator that sweeps the modulated tap.
//! - **`modulation`**: maps modulator values into parameter ranges.
//! - **`mod_delay`**: one delay tap with dry/wet levels and feedback, used
//!   for flanger, vibrato and chorus.
//! - **`taps`**: the 14 tap-timing topologies.
//! - **`four_tap`**: the per-channel engine tying it all together.

pub mod delay_line;
pub mod envelope;
pub mod four_tap;
pub mod lfo;
pub mod mod_delay;
pub mod modulation;
pub mod taps;
