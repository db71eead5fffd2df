use crate::animation::ease::Ease;
use crate::foundation::timebase::TimeUs;
use crate::project::model::{TimeWarpMode, TrackKind};
use serde::{Deserialize, Serialize};

/// Version tag written into every plan.
pub const PLAN_VERSION: &str = "veir-pro-v0";
/// Timebase tag written into every plan: all plan times are integer microseconds.
pub const PLAN_TIMEBASE: &str = "us";

/// Bus id of the single master bus.
pub const MASTER_BUS_ID: &str = "master";

/// Compiled, flat description of everything to draw and mix, and when.
///
/// A plan is built fresh by every [`compile`](fn@crate::compile) call and is an immutable value
/// afterwards. It serializes to JSON so preview and export passes can share, cache and diff it
/// (see [`RenderPlan::fingerprint`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    /// Always [`PLAN_VERSION`].
    pub version: String,
    /// Always [`PLAN_TIMEBASE`].
    pub timebase: String,
    /// Global output metadata.
    pub meta: PlanMeta,
    /// Video clips sorted by `(layer, start_us, clip_id)`.
    pub video: Vec<VideoClipPlan>,
    /// Audio mixing graph.
    pub audio: AudioGraphPlan,
}

/// Global output metadata of a [`RenderPlan`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    /// Output frame rate.
    pub fps: f64,
    /// Output duration.
    pub duration_us: TimeUs,
    /// `ceil(duration_seconds * fps)`.
    pub frame_count: u64,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Output audio format.
    pub audio: AudioFormat,
}

/// Output audio format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Sample layout handed between mixer, stretcher and encoder.
    pub sample_format: SampleFormat,
}

/// Sample layout tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SampleFormat {
    /// One `f32` buffer per channel.
    #[default]
    F32Planar,
}

/// One video clip to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoClipPlan {
    /// Clip id.
    pub clip_id: String,
    /// Asset id.
    pub asset_id: String,
    /// Owning track id.
    pub track_id: String,
    /// Owning track kind (`video` or `pip`).
    pub track_kind: TrackKind,
    /// Stacking layer; higher paints later.
    pub layer: i32,
    /// Timeline start (inclusive).
    pub start_us: TimeUs,
    /// Timeline end (exclusive); always `> start_us`.
    pub end_us: TimeUs,
    /// Source window start.
    pub source_start_us: TimeUs,
    /// Source window end; `None` means open-ended.
    pub source_end_us: Option<TimeUs>,
    /// Outgoing transition window on the timeline.
    pub transition_out: Option<TransitionWindow>,
    /// Normalized source speed curve.
    pub time_warp: Option<TimeWarpPlan>,
}

/// Outgoing transition occupying `[start_us, end_us)` at the tail of a clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionWindow {
    /// Transition type as authored.
    pub kind: String,
    /// Window start.
    pub start_us: TimeUs,
    /// Window end (the clip end).
    pub end_us: TimeUs,
    /// Progress easing.
    pub easing: Ease,
}

/// Where an audio clip's samples come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSourceKind {
    /// A native audio asset on an audio track.
    AudioAsset,
    /// The embedded audio stream of a video asset on a video/pip track.
    VideoAssetAudio,
}

/// One audio clip to mix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClipPlan {
    /// Clip id.
    pub clip_id: String,
    /// Asset id.
    pub asset_id: String,
    /// Owning track id.
    pub track_id: String,
    /// Sample source kind.
    pub source_kind: AudioSourceKind,
    /// Timeline start (inclusive).
    pub start_us: TimeUs,
    /// Timeline end (exclusive); always `> start_us`.
    pub end_us: TimeUs,
    /// Source window start.
    pub source_start_us: TimeUs,
    /// Source window end; `None` means open-ended.
    pub source_end_us: Option<TimeUs>,
    /// Linear gain.
    pub gain: f64,
    /// Mute flag.
    pub muted: bool,
    /// Derived fade-in length, from the previous clip's outgoing transition.
    pub fade_in_us: TimeUs,
    /// Derived fade-out length, from this clip's outgoing transition.
    pub fade_out_us: TimeUs,
    /// Prefer the pitch-preserving stretch backend.
    pub maintain_pitch: bool,
    /// Normalized source speed curve.
    pub time_warp: Option<TimeWarpPlan>,
}

/// Normalized time-warp: clip-local windows, speeds clamped to `[0.1, 4.0]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWarpPlan {
    /// Window behavior.
    pub mode: TimeWarpMode,
    /// Non-empty, sorted by `(start_us, end_us)`.
    pub segments: Vec<TimeWarpSegmentPlan>,
}

/// One normalized time-warp window, clip-local.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWarpSegmentPlan {
    /// Window start, `>= 0`.
    pub start_us: TimeUs,
    /// Window end, `> start_us` and `<=` clip duration.
    pub end_us: TimeUs,
    /// Speed multiplier in `[0.1, 4.0]`.
    pub speed: f64,
    /// Ramp easing.
    pub easing: Option<Ease>,
}

/// Kind of an audio bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusKind {
    /// Per-track bus.
    Track,
    /// The single master bus.
    Master,
}

/// One mixing node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBusPlan {
    /// Bus id.
    pub id: String,
    /// Bus kind.
    pub kind: BusKind,
    /// Track feeding this bus (track buses only).
    pub track_id: Option<String>,
    /// Linear gain.
    pub gain: f64,
    /// Mute flag.
    pub muted: bool,
    /// Optional sidechain ducking.
    pub ducking: Option<DuckingPlan>,
}

/// Sidechain ducking descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuckingPlan {
    /// Bus whose level drives the ducking.
    pub sidechain_bus_id: String,
    /// Gain reduction amount in `[0, 1]`.
    pub amount: f64,
    /// Attack time.
    pub attack_us: TimeUs,
    /// Release time.
    pub release_us: TimeUs,
}

/// Clip-to-bus routing entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRoute {
    /// Routed clip.
    pub clip_id: String,
    /// Destination bus.
    pub bus_id: String,
    /// Send level (linear).
    pub send: f64,
}

/// Audio mixing graph of a [`RenderPlan`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioGraphPlan {
    /// Output sample rate.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Output sample layout.
    pub sample_format: SampleFormat,
    /// Track buses sorted by id, followed by exactly one master bus.
    pub buses: Vec<AudioBusPlan>,
    /// Audio clips sorted by `(start_us, clip_id)`.
    pub clips: Vec<AudioClipPlan>,
    /// One route per clip, in clip order.
    pub routes: Vec<AudioRoute>,
    /// Id of the master bus.
    pub master_bus_id: String,
}

impl RenderPlan {
    /// Look up a video clip by id.
    pub fn video_clip(&self, clip_id: &str) -> Option<&VideoClipPlan> {
        self.video.iter().find(|c| c.clip_id == clip_id)
    }

    /// Look up an audio clip by id. Video clips with embedded audio share their clip id.
    pub fn audio_clip(&self, clip_id: &str) -> Option<&AudioClipPlan> {
        self.audio.clips.iter().find(|c| c.clip_id == clip_id)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> crate::VeirResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::VeirError::serde(e.to_string()))
    }
}

impl AudioGraphPlan {
    /// The master bus.
    pub fn master(&self) -> Option<&AudioBusPlan> {
        self.buses.iter().find(|b| b.kind == BusKind::Master)
    }

    /// Bus a clip is routed to.
    pub fn bus_for_clip(&self, clip_id: &str) -> Option<&AudioBusPlan> {
        let route = self.routes.iter().find(|r| r.clip_id == clip_id)?;
        self.buses.iter().find(|b| b.id == route.bus_id)
    }
}

/// Bus id for the bus fed by `track_id`.
pub fn track_bus_id(track_id: &str) -> String {
    format!("track:{track_id}")
}
