//! Time-stretching of planar `f32` audio along a caller-supplied ratio curve.
//!
//! The engine never sees clips or plans. Callers describe "which ratio applies when" with a
//! [`RatioFn`] (usually built from [`TimeWarpCurve`](crate::TimeWarpCurve)) and the backend only
//! decides how to resample at that ratio.

pub(crate) mod codec;
pub(crate) mod engine;
pub(crate) mod fallback;
pub(crate) mod hq;
pub(crate) mod ratio;
pub(crate) mod segment;
pub(crate) mod transport;

use crate::foundation::timebase::TimeUs;

/// Ratio curve: output time of a frame to the stretch ratio (output duration per input duration)
/// that applies there.
pub type RatioFn<'a> = dyn Fn(TimeUs) -> f64 + Send + Sync + 'a;

/// Quality hint for a stretch request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StretchQuality {
    /// Default segmentation.
    #[default]
    Balanced,
    /// Shorter segments that follow fast-changing curves more closely, at higher cost.
    Precise,
}

/// Which backend an engine ended up with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Pitch-preserving codec behind the background stretch context.
    HighQuality,
    /// In-process linear interpolation.
    Fallback,
}

/// One stretch request.
pub struct StretchRequest<'a> {
    /// Sample rate of input and output.
    pub sample_rate: u32,
    /// Channel count; must match `input.len()`.
    pub channels: u16,
    /// Planar input, one equally long buffer per channel.
    pub input: &'a [Vec<f32>],
    /// Exact number of frames to produce per channel.
    pub output_frames: usize,
    /// Ratio curve, sampled once per output frame.
    pub ratio_at: &'a RatioFn<'a>,
    /// Quality hint.
    pub quality: StretchQuality,
}

impl std::fmt::Debug for StretchRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StretchRequest")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("input_frames", &self.input.first().map_or(0, Vec::len))
            .field("output_frames", &self.output_frames)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}
