use crate::animation::ease::Ease;
use crate::foundation::error::{VeirError, VeirResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Editable project description produced by the editor.
///
/// This is the boundary format: every time field is in float seconds. The compiler converts to
/// [`TimeUs`](crate::TimeUs) on the way in and nothing downstream sees seconds again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Global output settings.
    pub meta: ProjectMeta,
    /// Asset table.
    #[serde(default)]
    pub assets: AssetTable,
    /// Tracks and clips.
    pub timeline: Timeline,
    /// Optional per-clip overrides.
    #[serde(default)]
    pub adjustments: Option<Adjustments>,
}

/// Global output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Output frame rate (frames per second, may be fractional such as `29.97`).
    pub fps: f64,
    /// Output duration in seconds.
    pub duration_seconds: f64,
    /// Output canvas size.
    #[serde(default)]
    pub resolution: Resolution,
}

/// Output canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Assets keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTable {
    /// Asset id to asset.
    #[serde(default)]
    pub assets_by_id: BTreeMap<String, Asset>,
}

impl AssetTable {
    /// Look up an asset by id.
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets_by_id.get(id)
    }
}

/// One ingested media asset. Only the fields the compiler needs are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Asset id (mirrors its key in [`AssetTable::assets_by_id`]).
    #[serde(default)]
    pub id: String,
    /// Media kind.
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// `true` when a video asset carries an embedded audio stream.
    #[serde(default)]
    pub has_audio: bool,
    /// Source media length in seconds, when known.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Media kind of an [`Asset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    /// Video (optionally with embedded audio).
    Video,
    /// Audio only.
    Audio,
    /// Still image.
    Image,
    /// Anything else (text presets, shapes, ...); never contributes audio.
    #[serde(other)]
    Other,
}

/// Ordered track list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Tracks in authoring order. Order carries no meaning; `layer` decides stacking.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// One timeline track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Track id.
    pub id: String,
    /// Track kind.
    #[serde(rename = "type")]
    pub kind: TrackKind,
    /// Stacking layer; higher layers paint later.
    #[serde(default)]
    pub layer: i32,
    /// Clips on this track.
    #[serde(default)]
    pub clips: Vec<Clip>,
    /// Optional bus settings for the audio this track contributes.
    #[serde(default)]
    pub audio: Option<TrackAudio>,
}

/// Kind of a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    /// Main video track.
    Video,
    /// Picture-in-picture overlay track.
    Pip,
    /// Audio track.
    Audio,
    /// Any other track kind (text, effects, ...); ignored by the compiler.
    #[serde(other)]
    Other,
}

impl TrackKind {
    /// `true` for track kinds that produce video clips.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Video | Self::Pip)
    }
}

/// Per-track bus settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAudio {
    /// Linear bus gain.
    #[serde(default)]
    pub gain: Option<f64>,
    /// Mute the whole bus.
    #[serde(default)]
    pub muted: Option<bool>,
    /// Duck this bus under another track's bus.
    #[serde(default)]
    pub ducking: Option<DuckingDef>,
}

/// Sidechain ducking request. Times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuckingDef {
    /// Track whose bus drives the ducking.
    pub sidechain_track_id: String,
    /// Gain reduction amount in `[0, 1]`.
    pub amount: f64,
    /// Attack time in seconds.
    #[serde(default = "default_duck_attack")]
    pub attack: f64,
    /// Release time in seconds.
    #[serde(default = "default_duck_release")]
    pub release: f64,
}

fn default_duck_attack() -> f64 {
    0.05
}

fn default_duck_release() -> f64 {
    0.3
}

/// One clip placed on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Clip id, unique within the project.
    pub id: String,
    /// Referenced asset id.
    pub asset: String,
    /// Timeline window `[start, end)` in seconds.
    pub time: TimeRange,
    /// Source window in seconds; open-ended when absent.
    #[serde(default)]
    pub source_range: Option<TimeRange>,
    /// Outgoing transition into the next clip on the same track.
    #[serde(default)]
    pub transition_out: Option<TransitionDef>,
}

/// Half-open `[start, end)` window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Window start.
    pub start: f64,
    /// Window end (exclusive).
    pub end: f64,
}

/// Outgoing transition authored on a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
    /// Transition type (`"crossfade"`, `"wipe"`, ...). Interpreted by the renderer.
    #[serde(rename = "type")]
    pub kind: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Optional easing of the transition progress.
    #[serde(default)]
    pub easing: Option<Ease>,
}

/// Optional adjustments layered over the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustments {
    /// Overrides keyed by clip id.
    #[serde(default)]
    pub clip_overrides: BTreeMap<String, ClipOverride>,
}

/// Per-clip overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipOverride {
    /// Audio overrides.
    #[serde(default)]
    pub audio: Option<AudioOverride>,
    /// Video overrides.
    #[serde(default)]
    pub video: Option<VideoOverride>,
}

/// Audio overrides for one clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioOverride {
    /// Linear gain.
    #[serde(default)]
    pub gain: Option<f64>,
    /// Mute flag.
    #[serde(default)]
    pub muted: Option<bool>,
    /// Playback speed curve applied to the source.
    #[serde(default)]
    pub time_warp: Option<TimeWarpDef>,
    /// Keep pitch constant when the speed changes.
    #[serde(default)]
    pub maintain_pitch: Option<bool>,
}

/// Video overrides for one clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOverride {
    /// Playback speed curve applied to the source.
    #[serde(default)]
    pub time_warp: Option<TimeWarpDef>,
}

/// Authored time-warp: a list of clip-local windows with a speed multiplier each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWarpDef {
    /// How speed behaves inside a window.
    #[serde(default)]
    pub mode: TimeWarpMode,
    /// Speed windows, clip-local seconds.
    #[serde(default)]
    pub segments: Vec<TimeWarpSegmentDef>,
}

/// How speed behaves inside a time-warp window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeWarpMode {
    /// Constant speed for the whole window.
    #[default]
    Hold,
    /// Speed moves from `1.0` at window start to the segment speed at window end.
    Ramp,
}

/// One authored time-warp window (clip-local seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWarpSegmentDef {
    /// Window start.
    pub start: f64,
    /// Window end (exclusive).
    pub end: f64,
    /// Speed multiplier (`2.0` plays the source twice as fast).
    pub speed: f64,
    /// Ramp shape for [`TimeWarpMode::Ramp`].
    #[serde(default)]
    pub easing: Option<Ease>,
}

impl Project {
    /// Parse a project from JSON text.
    pub fn from_json_str(s: &str) -> VeirResult<Self> {
        serde_json::from_str(s).map_err(|e| VeirError::serde(format!("invalid project JSON: {e}")))
    }

    /// Read and parse a project JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> VeirResult<Self> {
        use anyhow::Context as _;
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> VeirResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| VeirError::serde(e.to_string()))
    }

    /// Overrides for `clip_id`, if any.
    pub fn clip_override(&self, clip_id: &str) -> Option<&ClipOverride> {
        self.adjustments
            .as_ref()
            .and_then(|a| a.clip_overrides.get(clip_id))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/model.rs"]
mod tests;
