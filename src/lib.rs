//! veir is the render-plan core of a video editor.
//!
//! It turns an editable [`Project`] into a flat, deterministic [`RenderPlan`], expands the plan
//! into per-frame and per-chunk timing with [`build_schedule`], and time-stretches planar audio
//! along arbitrary speed curves with a [`StretchEngine`].
//!
//! - Load a [`Project`] from JSON or assemble one with [`ProjectBuilder`]
//! - [`compile`] it into a [`RenderPlan`] plus non-fatal [`Diagnostic`]s
//! - [`build_schedule`] for the video frame grid and audio chunk grid
//! - Feed a clip's [`TimeWarpCurve`] to [`StretchEngine::stretch_planar_f32`]
//!
//! All engine time is integer microseconds ([`TimeUs`]); float seconds appear only at the project
//! boundary.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod compile;
pub(crate) mod eval;
pub(crate) mod project;
pub(crate) mod stretch;

pub use crate::foundation::error::{VeirError, VeirResult};
pub use crate::foundation::timebase::{
    TimeUs, US_PER_SEC, clamp, frame_count, frame_to_us, sample_to_us, secs_to_us, us_to_frame,
    us_to_sample, us_to_samples_ceil, us_to_secs,
};

pub use crate::animation::ease::Ease;

pub use crate::project::dsl::{ClipBuilder, ProjectBuilder, TrackBuilder};
pub use crate::project::model::{
    Adjustments, Asset, AssetKind, AssetTable, AudioOverride, Clip, ClipOverride, DuckingDef,
    Project, ProjectMeta, Resolution, TimeRange, TimeWarpDef, TimeWarpMode, TimeWarpSegmentDef,
    Timeline, Track, TrackAudio, TrackKind, TransitionDef, VideoOverride,
};

pub use crate::compile::compiler::{
    AudioOutputOptions, CompileOptions, Compiled, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
    Diagnostic, DiagnosticKind, IntegrityPolicy, compile,
};
pub use crate::compile::fingerprint::PlanFingerprint;
pub use crate::compile::plan::{
    AudioBusPlan, AudioClipPlan, AudioFormat, AudioGraphPlan, AudioRoute, AudioSourceKind,
    BusKind, DuckingPlan, MASTER_BUS_ID, PLAN_TIMEBASE, PLAN_VERSION, PlanMeta, RenderPlan,
    SampleFormat, TimeWarpPlan, TimeWarpSegmentPlan, TransitionWindow, VideoClipPlan,
    track_bus_id,
};
pub use crate::compile::time_warp::{
    MAX_WARP_SPEED, MIN_WARP_SPEED, TimeWarpCurve, normalize_time_warp,
};

pub use crate::eval::schedule::{
    AudioChunk, DEFAULT_AUDIO_CHUNK_FRAMES, Schedule, ScheduleOpts, VideoFrameInstant,
    active_video_clips, audio_clips_in_chunk, build_schedule,
};

pub use crate::stretch::codec::{FfmpegAtempoCodec, SpeedCodec, is_ffmpeg_on_path};
pub use crate::stretch::engine::{BackendPreference, StretchEngine, StretchEngineOpts};
pub use crate::stretch::fallback::LinearStretcher;
pub use crate::stretch::ratio::{
    MAX_RATIO, MIN_RATIO, input_frames_for_curve, safe_ratio, sample_ratio_curve,
};
pub use crate::stretch::segment::{
    RatioSegment, SegmentTuning, chain_speed_steps, segment_ratio_curve,
};
pub use crate::stretch::{BackendKind, RatioFn, StretchQuality, StretchRequest};
