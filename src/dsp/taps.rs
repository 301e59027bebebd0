//! # Tap Timing
//!
//! Maps the mode selector (1–14) and the two base delay times to up to
//! four tap times. Taps are chained: each active tap adds its own base
//! time (short or long) to the tap before it, so tap times always grow.
//!
//! ```text
//! mode 7 (S S L), short = 100 ms, long = 300 ms
//!
//!   tap 0 = 100
//!   tap 1 = 100 + 100 = 200
//!   tap 2 = 200 + 300 = 500
//!   tap 3 = inactive (0)
//! ```
//!
//! The schedule is a musical choice, not a formula, so it lives in a table.

/// Number of taps the static bus reads.
pub const MAX_TAPS: usize = 4;

/// Which base delay time a tap adds to the previous tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapBase {
    Short,
    Long,
}

/// The taps one mode activates, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapSchedule {
    pub sources: &'static [TapBase],
}

impl TapSchedule {
    pub const fn tap_count(&self) -> usize {
        self.sources.len()
    }
}

use TapBase::{Long as L, Short as S};

/// Row `mode - 1` is the schedule for that mode.
const SCHEDULES: [TapSchedule; 14] = [
    TapSchedule { sources: &[S] },
    TapSchedule { sources: &[L] },
    TapSchedule { sources: &[S, S] },
    TapSchedule { sources: &[S, L] },
    TapSchedule { sources: &[L, L] },
    TapSchedule { sources: &[S, S, S] },
    TapSchedule { sources: &[S, S, L] },
    TapSchedule { sources: &[S, L, L] },
    TapSchedule { sources: &[L, L, L] },
    TapSchedule { sources: &[S, S, S, S] },
    TapSchedule { sources: &[S, S, S, L] },
    TapSchedule { sources: &[S, S, L, L] },
    TapSchedule { sources: &[S, L, L, L] },
    TapSchedule { sources: &[L, L, L, L] },
];

/// Schedule for a 1-based mode, or `None` outside 1..=14.
pub fn schedule(mode: u32) -> Option<&'static TapSchedule> {
    let index = usize::try_from(mode).ok()?.checked_sub(1)?;
    SCHEDULES.get(index)
}

/// Resolve the tap times in milliseconds for `mode`. Inactive taps are 0.
/// An unknown mode activates no taps.
pub fn resolve(mode: u32, short_ms: f32, long_ms: f32) -> [f32; MAX_TAPS] {
    let mut taps = [0.0; MAX_TAPS];
    let Some(schedule) = schedule(mode) else {
        return taps;
    };

    let mut previous = 0.0;
    for (tap, source) in taps.iter_mut().zip(schedule.sources) {
        let increment = match source {
            TapBase::Short => short_ms,
            TapBase::Long => long_ms,
        };
        *tap = previous + increment;
        previous = *tap;
    }
    taps
}
