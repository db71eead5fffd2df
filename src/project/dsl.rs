use std::collections::BTreeMap;

use crate::{
    animation::ease::Ease,
    foundation::error::{VeirError, VeirResult},
    project::model::{
        Adjustments, Asset, AssetKind, AssetTable, AudioOverride, Clip, ClipOverride, Project,
        ProjectMeta, Resolution, TimeRange, TimeWarpDef, Timeline, Track, TrackAudio, TrackKind,
        TransitionDef,
    },
};

/// Builder for [`Project`](crate::Project).
pub struct ProjectBuilder {
    fps: f64,
    duration_seconds: f64,
    resolution: Resolution,
    assets: BTreeMap<String, Asset>,
    tracks: Vec<Track>,
    overrides: BTreeMap<String, ClipOverride>,
}

impl ProjectBuilder {
    /// Create a builder for a new project.
    pub fn new(fps: f64, duration_seconds: f64) -> Self {
        Self {
            fps,
            duration_seconds,
            resolution: Resolution::default(),
            assets: BTreeMap::new(),
            tracks: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Set output resolution.
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Resolution { width, height };
        self
    }

    /// Insert an asset under unique id.
    pub fn asset(mut self, id: impl Into<String>, mut asset: Asset) -> VeirResult<Self> {
        let id = id.into();
        if self.assets.contains_key(&id) {
            return Err(VeirError::validation(format!("duplicate asset id '{id}'")));
        }
        asset.id = id.clone();
        self.assets.insert(id, asset);
        Ok(self)
    }

    /// Convenience helper to add a video asset.
    pub fn video_asset(self, id: impl Into<String>, has_audio: bool) -> VeirResult<Self> {
        self.asset(
            id,
            Asset {
                id: String::new(),
                kind: AssetKind::Video,
                has_audio,
                duration_seconds: None,
            },
        )
    }

    /// Convenience helper to add an audio asset.
    pub fn audio_asset(self, id: impl Into<String>) -> VeirResult<Self> {
        self.asset(
            id,
            Asset {
                id: String::new(),
                kind: AssetKind::Audio,
                has_audio: true,
                duration_seconds: None,
            },
        )
    }

    /// Append a track.
    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Attach overrides to a clip.
    pub fn clip_override(mut self, clip_id: impl Into<String>, ov: ClipOverride) -> Self {
        self.overrides.insert(clip_id.into(), ov);
        self
    }

    /// Attach an audio time-warp to a clip, keeping other audio overrides.
    pub fn audio_time_warp(mut self, clip_id: impl Into<String>, warp: TimeWarpDef) -> Self {
        let entry = self.overrides.entry(clip_id.into()).or_default();
        entry
            .audio
            .get_or_insert_with(AudioOverride::default)
            .time_warp = Some(warp);
        self
    }

    /// Build the final [`Project`](crate::Project).
    pub fn build(self) -> VeirResult<Project> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(VeirError::validation("project fps must be finite and > 0"));
        }
        Ok(Project {
            meta: ProjectMeta {
                fps: self.fps,
                duration_seconds: self.duration_seconds,
                resolution: self.resolution,
            },
            assets: AssetTable {
                assets_by_id: self.assets,
            },
            timeline: Timeline {
                tracks: self.tracks,
            },
            adjustments: (!self.overrides.is_empty()).then_some(Adjustments {
                clip_overrides: self.overrides,
            }),
        })
    }
}

/// Builder for [`Track`](crate::Track) values.
pub struct TrackBuilder {
    id: String,
    kind: TrackKind,
    layer: i32,
    audio: Option<TrackAudio>,
    clips: Vec<Clip>,
}

impl TrackBuilder {
    /// Create a track builder with required `id` and kind.
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            layer: 0,
            audio: None,
            clips: Vec::new(),
        }
    }

    /// Set stacking layer.
    pub fn layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    /// Set bus settings.
    pub fn audio(mut self, audio: TrackAudio) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Append clip to the track.
    pub fn clip(mut self, clip: Clip) -> Self {
        self.clips.push(clip);
        self
    }

    /// Build validated [`Track`](crate::Track).
    pub fn build(self) -> VeirResult<Track> {
        if self.id.trim().is_empty() {
            return Err(VeirError::validation("track id must be non-empty"));
        }
        Ok(Track {
            id: self.id,
            kind: self.kind,
            layer: self.layer,
            clips: self.clips,
            audio: self.audio,
        })
    }
}

/// Builder for [`Clip`](crate::Clip) values.
pub struct ClipBuilder {
    id: String,
    asset: String,
    time: TimeRange,
    source_range: Option<TimeRange>,
    transition_out: Option<TransitionDef>,
}

impl ClipBuilder {
    /// Create clip builder with required identifiers and timeline window in seconds.
    pub fn new(id: impl Into<String>, asset: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            asset: asset.into(),
            time: TimeRange { start, end },
            source_range: None,
            transition_out: None,
        }
    }

    /// Set the source window in seconds.
    pub fn source_range(mut self, start: f64, end: f64) -> Self {
        self.source_range = Some(TimeRange { start, end });
        self
    }

    /// Set the outgoing transition.
    pub fn transition_out(mut self, kind: impl Into<String>, duration: f64, easing: Option<Ease>) -> Self {
        self.transition_out = Some(TransitionDef {
            kind: kind.into(),
            duration,
            easing,
        });
        self
    }

    /// Build validated [`Clip`](crate::Clip).
    pub fn build(self) -> VeirResult<Clip> {
        if self.id.trim().is_empty() {
            return Err(VeirError::validation("clip id must be non-empty"));
        }
        if self.asset.trim().is_empty() {
            return Err(VeirError::validation("clip asset id must be non-empty"));
        }
        Ok(Clip {
            id: self.id,
            asset: self.asset,
            time: self.time,
            source_range: self.source_range,
            transition_out: self.transition_out,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/project/dsl.rs"]
mod tests;
