use crate::stretch::StretchQuality;
use crate::stretch::ratio::safe_ratio;

/// Segmentation settings for the high-quality backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentTuning {
    /// Shortest non-final segment, in seconds of output.
    pub min_window_sec: f64,
    /// Longest segment, in seconds of output.
    pub max_window_sec: f64,
    /// A segment is cut once `max - min` of its ratios would exceed this (after the minimum).
    pub variance_threshold: f64,
}

impl Default for SegmentTuning {
    fn default() -> Self {
        Self {
            min_window_sec: 0.25,
            max_window_sec: 2.0,
            variance_threshold: 0.06,
        }
    }
}

impl SegmentTuning {
    /// Tighter variant used for [`StretchQuality::Precise`].
    pub fn precise(self) -> Self {
        Self {
            min_window_sec: self.min_window_sec.min(0.1),
            max_window_sec: self.max_window_sec,
            variance_threshold: self.variance_threshold.min(0.02),
        }
    }

    /// Tuning to use for `quality`.
    pub fn for_quality(self, quality: StretchQuality) -> Self {
        match quality {
            StretchQuality::Balanced => self,
            StretchQuality::Precise => self.precise(),
        }
    }

    fn window_frames(&self, sample_rate: u32) -> (usize, usize) {
        let frames = |sec: f64| {
            let f = (sec * f64::from(sample_rate)).round();
            if f.is_finite() && f >= 1.0 { f as usize } else { 1 }
        };
        let min = frames(self.min_window_sec);
        (min, frames(self.max_window_sec).max(min))
    }
}

/// A run of output frames rendered at one constant ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioSegment {
    /// First output frame.
    pub start: usize,
    /// Output frames in the segment.
    pub len: usize,
    /// Constant ratio for the run: output frames over the input frames the curve consumes.
    pub ratio: f64,
}

impl RatioSegment {
    /// One past the last output frame.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Split a per-frame ratio curve into constant-ratio segments with one forward scan.
///
/// Segments tile `[0, curve.len())` in order. Every segment but the last is at least the minimum
/// window long; none is longer than the maximum window. Past the minimum, a segment ends early
/// as soon as its ratio spread would exceed the variance threshold.
pub fn segment_ratio_curve(
    curve: &[f64],
    sample_rate: u32,
    tuning: &SegmentTuning,
) -> Vec<RatioSegment> {
    let (min_len, max_len) = tuning.window_frames(sample_rate);
    let threshold = if tuning.variance_threshold.is_finite() {
        tuning.variance_threshold.max(0.0)
    } else {
        0.0
    };

    let mut out = Vec::new();
    let mut start = 0;
    while start < curve.len() {
        let first = safe_ratio(curve[start]);
        let (mut lo, mut hi) = (first, first);
        let mut input_frames = 1.0 / first;
        let mut end = start + 1;

        while end < curve.len() && end - start < max_len {
            let r = safe_ratio(curve[end]);
            let (next_lo, next_hi) = (lo.min(r), hi.max(r));
            if end - start >= min_len && next_hi - next_lo > threshold {
                break;
            }
            lo = next_lo;
            hi = next_hi;
            input_frames += 1.0 / r;
            end += 1;
        }

        let len = end - start;
        out.push(RatioSegment {
            start,
            len,
            ratio: safe_ratio(len as f64 / input_frames),
        });
        start = end;
    }
    out
}

/// Factor `speed` into primitive steps that each lie in `[lo, hi]` and multiply back to `speed`.
///
/// Uses the fewest equal steps: a 4x speed-up with a native range of `[0.5, 2.0]` is two 2x
/// steps. Returns `[1.0]` for a degenerate speed or range.
pub fn chain_speed_steps(speed: f64, lo: f64, hi: f64) -> Vec<f64> {
    const MAX_STEPS: u32 = 16;
    let range_ok = lo > 0.0 && lo < 1.0 && hi > 1.0 && hi.is_finite();
    if !speed.is_finite() || speed <= 0.0 || !range_ok {
        return vec![1.0];
    }
    if (lo..=hi).contains(&speed) {
        return vec![speed];
    }
    let per_step_limit = if speed > 1.0 { hi.ln() } else { lo.ln() };
    let steps = (speed.ln() / per_step_limit - 1e-9)
        .ceil()
        .clamp(1.0, f64::from(MAX_STEPS)) as u32;
    let step = speed.powf(1.0 / f64::from(steps)).clamp(lo, hi);
    vec![step; steps as usize]
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/segment.rs"]
mod tests;
