//! Integer-microsecond timebase.
//!
//! Every engine structure stores time as [`TimeUs`]. Float seconds only appear at the project
//! boundary and at the stretch/ratio edges, and are converted here. Conversions round the
//! microsecond value half away from zero so repeated compiles land on identical grids.

use std::ops::{Add, Sub};

/// Microseconds per second.
pub const US_PER_SEC: i64 = 1_000_000;

/// Engine time in integer microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TimeUs(pub i64);

impl TimeUs {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw microsecond count.
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    /// Raw microsecond count.
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Convert seconds to the nearest microsecond. See [`secs_to_us`].
    pub fn from_secs(secs: f64) -> Self {
        secs_to_us(secs)
    }

    /// Convert to float seconds. See [`us_to_secs`].
    pub fn as_secs(self) -> f64 {
        us_to_secs(self)
    }

    /// Non-negative distance from `earlier` to `self`.
    pub fn saturating_since(self, earlier: TimeUs) -> TimeUs {
        TimeUs(self.0.saturating_sub(earlier.0).max(0))
    }
}

impl Add for TimeUs {
    type Output = TimeUs;

    fn add(self, rhs: TimeUs) -> TimeUs {
        TimeUs(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimeUs {
    type Output = TimeUs;

    fn sub(self, rhs: TimeUs) -> TimeUs {
        TimeUs(self.0.saturating_sub(rhs.0))
    }
}

/// Seconds to microseconds, rounded half away from zero.
///
/// Non-finite input is not an error: NaN maps to zero and infinities saturate. Callers sanitize
/// before calling when that matters.
pub fn secs_to_us(secs: f64) -> TimeUs {
    TimeUs((secs * US_PER_SEC as f64).round() as i64)
}

/// Microseconds to float seconds.
pub fn us_to_secs(t: TimeUs) -> f64 {
    t.0 as f64 / US_PER_SEC as f64
}

/// Clamp `v` into `[min, max]`.
///
/// Unlike `f64::clamp` this never panics on `min > max` (it returns `min`) and passes NaN through
/// unchanged.
pub fn clamp<T: PartialOrd>(v: T, min: T, max: T) -> T {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

/// Time of frame `frame` at `fps`: `round(frame * 1e6 / fps)`.
///
/// Always computed from the index, never by accumulating `1 / fps`, so there is no drift.
pub fn frame_to_us(frame: u64, fps: f64) -> TimeUs {
    TimeUs(((frame as f64) * US_PER_SEC as f64 / fps).round() as i64)
}

/// Nearest frame index for `t` at `fps`; negative times map to frame 0.
pub fn us_to_frame(t: TimeUs, fps: f64) -> u64 {
    let f = ((t.0 as f64) * fps / US_PER_SEC as f64).round();
    if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
}

/// Number of frames needed to cover `duration_secs` at `fps`: `ceil(duration * fps)`.
///
/// A tolerance of `1e-9` frames absorbs float noise such as `0.1 * 30 = 3.0000000000000004`.
pub fn frame_count(duration_secs: f64, fps: f64) -> u64 {
    let frames = (duration_secs * fps - 1e-9).ceil();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

/// Time of sample `sample` at `sample_rate`, rounded half away from zero in integer space.
pub fn sample_to_us(sample: u64, sample_rate: u32) -> TimeUs {
    if sample_rate == 0 {
        return TimeUs::ZERO;
    }
    let num = u128::from(sample) * (US_PER_SEC as u128) * 2 + u128::from(sample_rate);
    let den = u128::from(sample_rate) * 2;
    TimeUs(i64::try_from(num / den).unwrap_or(i64::MAX))
}

/// Samples needed to cover `t` at `sample_rate`: `ceil(t * rate / 1e6)`. Negative `t` is zero.
pub fn us_to_samples_ceil(t: TimeUs, sample_rate: u32) -> u64 {
    if t.0 <= 0 {
        return 0;
    }
    let num = (t.0 as u128) * u128::from(sample_rate);
    let den = US_PER_SEC as u128;
    u64::try_from(num.div_ceil(den)).unwrap_or(u64::MAX)
}

/// Nearest sample index for `t` at `sample_rate`; negative times map to sample 0.
pub fn us_to_sample(t: TimeUs, sample_rate: u32) -> u64 {
    if t.0 <= 0 {
        return 0;
    }
    let num = (t.0 as u128) * u128::from(sample_rate) * 2 + US_PER_SEC as u128;
    let den = (US_PER_SEC as u128) * 2;
    u64::try_from(num / den).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/timebase.rs"]
mod tests;
