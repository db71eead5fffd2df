use crate::foundation::error::VeirResult;
use crate::stretch::codec::{FfmpegAtempoCodec, SpeedCodec};
use crate::stretch::fallback::LinearStretcher;
use crate::stretch::hq::HighQualityStretcher;
use crate::stretch::segment::SegmentTuning;
use crate::stretch::{BackendKind, StretchRequest};

/// Which backend [`StretchEngine::create`] should try.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// High-quality codec, falling back to linear interpolation if it cannot start.
    #[default]
    Auto,
    /// Linear interpolation only; no background context is started.
    FallbackOnly,
}

/// Options for [`StretchEngine`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StretchEngineOpts {
    /// Backend selection.
    pub backend: BackendPreference,
    /// Segmentation of the high-quality backend at [`StretchQuality::Balanced`](crate::StretchQuality).
    pub tuning: SegmentTuning,
}

enum Backend {
    HighQuality(HighQualityStretcher),
    Fallback(LinearStretcher),
}

/// Time-stretch engine with a backend chosen once, at construction.
///
/// Owns its background context (when it has one) until [`StretchEngine::destroy`] or drop.
pub struct StretchEngine {
    backend: Backend,
    tuning: SegmentTuning,
}

impl StretchEngine {
    /// Create an engine around the system `ffmpeg` `atempo` codec.
    pub async fn create(opts: StretchEngineOpts) -> Self {
        Self::with_codec(Box::new(FfmpegAtempoCodec::new()), opts).await
    }

    /// Create an engine around `codec`.
    ///
    /// Starts the background context and initializes the codec. Any failure on the way selects
    /// the linear fallback and logs a warning; the choice is never revisited.
    pub async fn with_codec(codec: Box<dyn SpeedCodec>, opts: StretchEngineOpts) -> Self {
        if opts.backend == BackendPreference::FallbackOnly {
            return Self::fallback(opts.tuning);
        }
        let hq = match HighQualityStretcher::spawn(codec) {
            Ok(hq) => hq,
            Err(e) => {
                tracing::warn!(error = %e, "stretch context failed to start; using linear fallback");
                return Self::fallback(opts.tuning);
            }
        };
        if let Err(e) = hq.init().await {
            tracing::warn!(error = %e, "high-quality stretch unavailable; using linear fallback");
            hq.destroy();
            return Self::fallback(opts.tuning);
        }
        tracing::debug!(codec = hq.codec_name(), "high-quality stretch ready");
        Self {
            backend: Backend::HighQuality(hq),
            tuning: opts.tuning,
        }
    }

    /// Engine that always uses the linear fallback.
    pub fn fallback(tuning: SegmentTuning) -> Self {
        Self {
            backend: Backend::Fallback(LinearStretcher),
            tuning,
        }
    }

    /// Backend in use.
    pub fn backend_kind(&self) -> BackendKind {
        match self.backend {
            Backend::HighQuality(_) => BackendKind::HighQuality,
            Backend::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// Stretch planar audio along `req.ratio_at`, producing exactly `req.output_frames` frames.
    ///
    /// The fallback never fails. The high-quality backend fails a single request with
    /// [`VeirError::Stretch`](crate::VeirError::Stretch) when the codec rejects it, and every
    /// pending request with [`VeirError::Transport`](crate::VeirError::Transport) when the
    /// background context dies or the engine is destroyed.
    #[tracing::instrument(skip(self, req), fields(backend = ?self.backend_kind(), frames = req.output_frames))]
    pub async fn stretch_planar_f32(&self, req: &StretchRequest<'_>) -> VeirResult<Vec<Vec<f32>>> {
        match &self.backend {
            Backend::HighQuality(hq) => hq.stretch(req, self.tuning.for_quality(req.quality)).await,
            Backend::Fallback(linear) => Ok(linear.stretch(req)),
        }
    }

    /// Release the background context. In-flight requests fail with a transport error right away.
    ///
    /// Returns without waiting for the worker: a codec job that is already running completes in
    /// the background and its result is discarded. Idempotent; a no-op for the fallback.
    pub fn destroy(&self) {
        if let Backend::HighQuality(hq) = &self.backend {
            hq.destroy();
        }
    }
}

impl std::fmt::Debug for StretchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StretchEngine")
            .field("backend", &self.backend_kind())
            .field("tuning", &self.tuning)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/engine.rs"]
mod tests;
