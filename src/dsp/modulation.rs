//! Mapping modulator values into parameter ranges.

/// Fold a bipolar value (-1..1) into the unipolar range (0..1).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Map a unipolar modulator up from `min`: 0 lands on `min`, 1 on `max`.
/// The modulator is clamped to `[0, 1]`.
#[inline]
pub fn unipolar_modulation_from_min(unipolar: f32, min: f32, max: f32) -> f32 {
    unipolar.clamp(0.0, 1.0) * (max - min) + min
}

/// Map a bipolar modulator around the centre of `[min, max]`: 0 lands on
/// the midpoint, -1 on `min`, +1 on `max`. The modulator is clamped to
/// `[-1, 1]`.
#[inline]
pub fn bipolar_modulation(bipolar: f32, min: f32, max: f32) -> f32 {
    let half_range = (max - min) * 0.5;
    bipolar.clamp(-1.0, 1.0) * half_range + min + half_range
}
