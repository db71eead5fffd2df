use rayon::prelude::*;

use crate::stretch::StretchRequest;
use crate::stretch::ratio::sample_ratio_curve;

/// Dependency-free stretcher: linear interpolation along the integrated ratio curve.
///
/// Never fails, never emits NaN, never reads out of bounds. Does not preserve pitch.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearStretcher;

impl LinearStretcher {
    /// Stretch `req.input` into exactly `req.output_frames` frames per input channel.
    pub fn stretch(&self, req: &StretchRequest<'_>) -> Vec<Vec<f32>> {
        let curve = sample_ratio_curve(req.ratio_at, req.output_frames, req.sample_rate);
        let positions = input_positions(&curve);
        req.input
            .par_iter()
            .map(|channel| render_channel(channel, &positions))
            .collect()
    }
}

/// Input read position of each output frame. Frame `i` reads at `sum(1 / ratio[k]) for k < i`.
pub(crate) fn input_positions(curve: &[f64]) -> Vec<f64> {
    let mut pos = 0.0f64;
    curve
        .iter()
        .map(|&r| {
            let here = pos;
            let step = 1.0 / r;
            pos += if step.is_finite() { step } else { 1.0 };
            here
        })
        .collect()
}

fn render_channel(input: &[f32], positions: &[f64]) -> Vec<f32> {
    if input.is_empty() {
        return vec![0.0; positions.len()];
    }
    let last = input.len() - 1;
    positions
        .iter()
        .map(|&p| {
            let p = if p.is_finite() { p.clamp(0.0, last as f64) } else { 0.0 };
            let i0 = p.floor() as usize;
            let i1 = (i0 + 1).min(last);
            let frac = (p - i0 as f64) as f32;
            let a = input[i0];
            let v = if frac > 0.0 {
                a + (input[i1] - a) * frac
            } else {
                a
            };
            if v.is_finite() { v } else { 0.0 }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/fallback.rs"]
mod tests;
