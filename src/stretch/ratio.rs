use crate::foundation::timebase::sample_to_us;
use crate::stretch::RatioFn;

/// Smallest stretch ratio the engine will apply (4x speed-up).
pub const MIN_RATIO: f64 = 0.25;
/// Largest stretch ratio the engine will apply (4x slow-down).
pub const MAX_RATIO: f64 = 4.0;

/// Sanitize a stretch ratio: non-finite is exactly `1.0`, anything else is clamped into
/// `[MIN_RATIO, MAX_RATIO]`.
pub fn safe_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(MIN_RATIO, MAX_RATIO)
    } else {
        1.0
    }
}

/// Sample `ratio_at` once per output frame and sanitize every value.
pub fn sample_ratio_curve(ratio_at: &RatioFn<'_>, output_frames: usize, sample_rate: u32) -> Vec<f64> {
    (0..output_frames)
        .map(|i| safe_ratio(ratio_at(sample_to_us(i as u64, sample_rate))))
        .collect()
}

/// Input frames consumed by rendering `curve`: the sum of `1 / ratio` over output frames.
pub fn input_frames_for_curve(curve: &[f64]) -> f64 {
    curve.iter().map(|&r| 1.0 / safe_ratio(r)).sum()
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/ratio.rs"]
mod tests;
