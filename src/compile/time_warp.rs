use crate::animation::ease::Ease;
use crate::compile::plan::{TimeWarpPlan, TimeWarpSegmentPlan};
use crate::foundation::timebase::{TimeUs, clamp, secs_to_us};
use crate::project::model::{TimeWarpDef, TimeWarpMode};

/// Slowest speed a time-warp window may request.
pub const MIN_WARP_SPEED: f64 = 0.1;
/// Fastest speed a time-warp window may request.
pub const MAX_WARP_SPEED: f64 = 4.0;

/// Normalize an authored time-warp against a clip of length `clip_duration`.
///
/// Segments with non-finite bounds or speed, and inverted or empty windows, are dropped. Bounds
/// are clamped into `[0, clip_duration]` and stay clip-local; a window that ends up empty after
/// clamping is dropped too. Speeds are clamped into `[MIN_WARP_SPEED, MAX_WARP_SPEED]`.
///
/// Returns the plan (`None` when nothing survives) and one message per dropped segment.
pub fn normalize_time_warp(
    def: &TimeWarpDef,
    clip_duration: TimeUs,
) -> (Option<TimeWarpPlan>, Vec<String>) {
    let mut segments = Vec::with_capacity(def.segments.len());
    let mut dropped = Vec::new();

    for (i, seg) in def.segments.iter().enumerate() {
        if !seg.start.is_finite() || !seg.end.is_finite() {
            dropped.push(format!("segment {i}: non-finite window bound"));
            continue;
        }
        if !seg.speed.is_finite() {
            dropped.push(format!("segment {i}: non-finite speed"));
            continue;
        }
        if seg.end <= seg.start {
            dropped.push(format!(
                "segment {i}: inverted or empty window [{}, {})",
                seg.start, seg.end
            ));
            continue;
        }

        let start_us = clamp(secs_to_us(seg.start), TimeUs::ZERO, clip_duration);
        let end_us = clamp(secs_to_us(seg.end), TimeUs::ZERO, clip_duration);
        if end_us <= start_us {
            dropped.push(format!("segment {i}: window lies outside the clip"));
            continue;
        }

        segments.push(TimeWarpSegmentPlan {
            start_us,
            end_us,
            speed: clamp(seg.speed, MIN_WARP_SPEED, MAX_WARP_SPEED),
            easing: seg.easing,
        });
    }

    segments.sort_by_key(|s| (s.start_us, s.end_us));
    let plan = (!segments.is_empty()).then(|| TimeWarpPlan {
        mode: def.mode,
        segments,
    });
    (plan, dropped)
}

/// Speed and ratio lookup over a normalized time-warp, in clip-local output time.
///
/// This is the bridge between a plan and the time-stretch engine: hand
/// `|t| curve.ratio_at(t)` to [`StretchRequest`](crate::StretchRequest) and the engine needs no
/// knowledge of clips or plans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeWarpCurve {
    mode: TimeWarpMode,
    segments: Vec<TimeWarpSegmentPlan>,
}

impl TimeWarpCurve {
    /// Build a curve; `None` yields the identity curve (speed 1 everywhere).
    pub fn new(plan: Option<&TimeWarpPlan>) -> Self {
        match plan {
            Some(p) => Self {
                mode: p.mode,
                segments: p.segments.clone(),
            },
            None => Self::default(),
        }
    }

    /// Source playback speed at clip-local time `t`. The first window containing `t` wins.
    pub fn speed_at(&self, t: TimeUs) -> f64 {
        let Some(seg) = self
            .segments
            .iter()
            .find(|s| s.start_us <= t && t < s.end_us)
        else {
            return 1.0;
        };
        match self.mode {
            TimeWarpMode::Hold => seg.speed,
            TimeWarpMode::Ramp => {
                let span = (seg.end_us.0 - seg.start_us.0) as f64;
                let p = (t.0 - seg.start_us.0) as f64 / span;
                let eased = seg.easing.unwrap_or(Ease::Linear).apply(p);
                1.0 + (seg.speed - 1.0) * eased
            }
        }
    }

    /// Stretch ratio (output duration per input duration) at `t`: `1 / speed`.
    pub fn ratio_at(&self, t: TimeUs) -> f64 {
        1.0 / self.speed_at(t)
    }

    /// `true` when the curve is the identity.
    pub fn is_identity(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/time_warp.rs"]
mod tests;
