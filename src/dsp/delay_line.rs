//! # Circular Delay Line
//!
//! A fixed-capacity ring buffer with a fractional read. Both the static
//! multi-tap bus and the modulated tap are built on it.
//!
//! ## Read/Write Order
//!
//! Every caller in this crate reads first and writes second within one
//! sample period, because the value written depends on what was read (the
//! feedback term). The delay is therefore counted from the slot that is
//! *about to be written*:
//!
//! ```text
//! call n:     read(d) ... write(x[n])
//! call n + d: read(d) == x[n]
//! ```
//!
//! A delay of zero would point at a sample that does not exist yet, so
//! reads are floored at one sample.
//!
//! ## Linear Interpolation
//!
//! Fractional delays blend the two neighbouring slots:
//!
//! ```text
//! result = sample_a * (1 - frac) + sample_b * frac
//! ```

use std::num::NonZeroUsize;

/// A ring buffer that functions as an audio delay line.
///
/// The buffer is allocated once in [`DelayLine::new`]. Writing, reading and
/// flushing never allocate.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,

    /// Slot the next [`write`](Self::write) lands in. Also the oldest
    /// stored sample once the buffer has wrapped.
    write_pos: usize,
}

impl DelayLine {
    /// Create a silent delay line holding `capacity` samples.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buffer: vec![0.0; capacity.get()],
            write_pos: 0,
        }
    }

    /// Number of samples the line can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Append one sample, overwriting the oldest slot, and advance the
    /// write head.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Read `delay_samples` behind the write head with linear interpolation.
    ///
    /// The delay is clamped to `[1, capacity - 1]`. Asking for more than
    /// `capacity - 1` is a caller error; the clamp only keeps the index
    /// arithmetic in bounds.
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let max_delay = len.saturating_sub(1).max(1) as f32;
        let delay = delay_samples.clamp(1.0, max_delay);

        let delay_int = delay as usize;
        let delay_frac = delay - delay_int as f32;

        // `len` is added before subtracting so the usize never underflows.
        let index_a = (self.write_pos + len - delay_int % len) % len;
        let index_b = (self.write_pos + 2 * len - (delay_int + 1) % len) % len;

        self.buffer[index_a] * (1.0 - delay_frac) + self.buffer[index_b] * delay_frac
    }

    /// Zero-fill the buffer and rewind the write head. The capacity is kept.
    pub fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
