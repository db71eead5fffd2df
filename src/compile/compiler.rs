use std::collections::{BTreeMap, BTreeSet};

use crate::{
    animation::ease::Ease,
    compile::plan::{
        AudioBusPlan, AudioClipPlan, AudioFormat, AudioGraphPlan, AudioRoute, AudioSourceKind,
        BusKind, DuckingPlan, MASTER_BUS_ID, PLAN_TIMEBASE, PLAN_VERSION, PlanMeta, RenderPlan,
        SampleFormat, TimeWarpPlan, TransitionWindow, VideoClipPlan, track_bus_id,
    },
    compile::time_warp::normalize_time_warp,
    foundation::error::{VeirError, VeirResult},
    foundation::timebase::{TimeUs, frame_count, secs_to_us},
    project::model::{
        Asset, AssetKind, Clip, ClipOverride, Project, TimeWarpDef, Track, TrackKind,
    },
};

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
/// Default output channel count.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Output audio format override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioOutputOptions {
    /// Output sample rate in Hz; must be non-zero.
    pub sample_rate: u32,
    /// Output channel count; must be non-zero.
    pub channels: u16,
}

impl Default for AudioOutputOptions {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

/// What to do with data-integrity problems (missing assets, malformed windows).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegrityPolicy {
    /// Skip or clamp the offending data and report a [`Diagnostic`].
    #[default]
    Lenient,
    /// Fail the compile on the first problem.
    Strict,
}

/// Options for [`compile`].
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Output audio format; `None` means 48 kHz stereo.
    pub audio: Option<AudioOutputOptions>,
    /// Data-integrity policy.
    pub policy: IntegrityPolicy,
}

/// Category of a compile diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// Clip references an asset id that is not in the asset table.
    MissingAsset,
    /// Clip window is non-finite, inverted or empty.
    EmptyClipWindow,
    /// A time-warp segment was dropped during normalization.
    MalformedTimeWarp,
    /// Asset kind cannot be placed on the track kind (e.g. image on an audio track).
    UnsupportedAsset,
}

/// Non-fatal problem found while compiling.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Category.
    pub kind: DiagnosticKind,
    /// Track the problem was found on.
    pub track_id: String,
    /// Clip the problem was found on.
    pub clip_id: Option<String>,
    /// Human-readable description.
    pub message: String,
}

/// Result of [`compile`]: the plan plus everything that was skipped or clamped on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    /// The render plan.
    pub plan: RenderPlan,
    /// Diagnostics in track/clip order. Always empty for a strict compile that succeeded.
    pub diagnostics: Vec<Diagnostic>,
}

struct DiagnosticSink {
    policy: IntegrityPolicy,
    list: Vec<Diagnostic>,
}

impl DiagnosticSink {
    fn report(
        &mut self,
        kind: DiagnosticKind,
        track: &Track,
        clip: Option<&Clip>,
        message: String,
    ) -> VeirResult<()> {
        let clip_id = clip.map(|c| c.id.clone());
        tracing::warn!(?kind, track = %track.id, clip = ?clip_id, "{message}");
        if self.policy == IntegrityPolicy::Strict {
            return Err(VeirError::compile(format!(
                "track '{}'{}: {message}",
                track.id,
                clip_id
                    .as_deref()
                    .map(|c| format!(" clip '{c}'"))
                    .unwrap_or_default()
            )));
        }
        self.list.push(Diagnostic {
            kind,
            track_id: track.id.clone(),
            clip_id,
            message,
        });
        Ok(())
    }
}

/// Timeline window of a clip after validation.
#[derive(Clone, Copy)]
struct ClipWindow {
    start: TimeUs,
    end: TimeUs,
    source_start: TimeUs,
    source_end: Option<TimeUs>,
}

/// Compile a project into a [`RenderPlan`].
///
/// Pure and deterministic: the same project yields a structurally identical plan regardless of
/// track, clip or map iteration order. Fails only on invalid global metadata, or on the first
/// data-integrity problem under [`IntegrityPolicy::Strict`].
#[tracing::instrument(skip(project, opts), fields(tracks = project.timeline.tracks.len()))]
pub fn compile(project: &Project, opts: &CompileOptions) -> VeirResult<Compiled> {
    let meta = &project.meta;
    if !meta.fps.is_finite() || meta.fps <= 0.0 {
        return Err(VeirError::validation(format!(
            "project fps must be finite and > 0 (got {})",
            meta.fps
        )));
    }
    if !meta.duration_seconds.is_finite() || meta.duration_seconds < 0.0 {
        return Err(VeirError::validation(format!(
            "project duration must be finite and >= 0 (got {})",
            meta.duration_seconds
        )));
    }
    let audio_out = opts.audio.unwrap_or_default();
    if audio_out.sample_rate == 0 || audio_out.channels == 0 {
        return Err(VeirError::validation(
            "audio sample_rate and channels must be non-zero",
        ));
    }

    let mut sink = DiagnosticSink {
        policy: opts.policy,
        list: Vec::new(),
    };
    let mut video = Vec::<VideoClipPlan>::new();
    let mut audio = Vec::<AudioClipPlan>::new();

    let mut tracks: Vec<&Track> = project.timeline.tracks.iter().collect();
    tracks.sort_by(|a, b| a.layer.cmp(&b.layer).then_with(|| a.id.cmp(&b.id)));

    for track in tracks {
        if track.kind == TrackKind::Other {
            tracing::debug!(track = %track.id, "skipping track without video or audio semantics");
            continue;
        }
        compile_track(project, track, &mut sink, &mut video, &mut audio)?;
    }

    video.sort_by(|a, b| {
        (a.layer, a.start_us, &a.clip_id, &a.track_id).cmp(&(
            b.layer,
            b.start_us,
            &b.clip_id,
            &b.track_id,
        ))
    });
    audio.sort_by(|a, b| {
        (a.start_us, &a.clip_id, &a.track_id).cmp(&(b.start_us, &b.clip_id, &b.track_id))
    });

    let graph = build_audio_graph(project, audio_out, audio);
    let plan = RenderPlan {
        version: PLAN_VERSION.to_owned(),
        timebase: PLAN_TIMEBASE.to_owned(),
        meta: PlanMeta {
            fps: meta.fps,
            duration_us: secs_to_us(meta.duration_seconds),
            frame_count: frame_count(meta.duration_seconds, meta.fps),
            width: meta.resolution.width,
            height: meta.resolution.height,
            audio: AudioFormat {
                sample_rate: audio_out.sample_rate,
                channels: audio_out.channels,
                sample_format: SampleFormat::F32Planar,
            },
        },
        video,
        audio: graph,
    };

    tracing::debug!(
        video_clips = plan.video.len(),
        audio_clips = plan.audio.clips.len(),
        buses = plan.audio.buses.len(),
        diagnostics = sink.list.len(),
        "compiled render plan"
    );
    Ok(Compiled {
        plan,
        diagnostics: sink.list,
    })
}

fn compile_track(
    project: &Project,
    track: &Track,
    sink: &mut DiagnosticSink,
    video: &mut Vec<VideoClipPlan>,
    audio: &mut Vec<AudioClipPlan>,
) -> VeirResult<()> {
    // Clips with a usable window, in timeline order. The previous entry of each clip is its
    // same-track neighbor, whose outgoing transition defines this clip's fade-in.
    let mut ordered: Vec<(&Clip, ClipWindow)> = Vec::with_capacity(track.clips.len());
    for clip in &track.clips {
        match clip_window(clip) {
            Some(w) => ordered.push((clip, w)),
            None => sink.report(
                DiagnosticKind::EmptyClipWindow,
                track,
                Some(clip),
                format!(
                    "clip window [{}, {}) is non-finite or empty; clip skipped",
                    clip.time.start, clip.time.end
                ),
            )?,
        }
    }
    ordered.sort_by(|(ca, wa), (cb, wb)| wa.start.cmp(&wb.start).then_with(|| ca.id.cmp(&cb.id)));

    for (i, &(clip, window)) in ordered.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| ordered[p].0);

        let Some(asset) = project.assets.get(&clip.asset) else {
            sink.report(
                DiagnosticKind::MissingAsset,
                track,
                Some(clip),
                format!("asset '{}' not found; clip skipped", clip.asset),
            )?;
            continue;
        };

        let ov = project.clip_override(&clip.id);
        let fade_in = transition_len(prev);
        let fade_out = transition_len(Some(clip));

        if track.kind.is_visual() {
            if asset.kind == AssetKind::Audio {
                sink.report(
                    DiagnosticKind::UnsupportedAsset,
                    track,
                    Some(clip),
                    format!("audio asset '{}' placed on a {:?} track", clip.asset, track.kind),
                )?;
                continue;
            }
            let video_warp = ov.and_then(|o| o.video.as_ref()).and_then(|v| v.time_warp.as_ref());
            let time_warp = normalize_warp(video_warp, window, track, clip, sink)?;
            video.push(VideoClipPlan {
                clip_id: clip.id.clone(),
                asset_id: clip.asset.clone(),
                track_id: track.id.clone(),
                track_kind: track.kind,
                layer: track.layer,
                start_us: window.start,
                end_us: window.end,
                source_start_us: window.source_start,
                source_end_us: window.source_end,
                transition_out: transition_window(clip, window),
                time_warp,
            });

            if asset.kind == AssetKind::Video && asset.has_audio {
                audio.push(audio_clip(
                    AudioSourceKind::VideoAssetAudio,
                    track,
                    clip,
                    window,
                    ov,
                    (fade_in, fade_out),
                    sink,
                )?);
            }
        } else {
            let source_kind = match asset {
                Asset {
                    kind: AssetKind::Audio,
                    ..
                } => AudioSourceKind::AudioAsset,
                Asset {
                    kind: AssetKind::Video,
                    has_audio: true,
                    ..
                } => AudioSourceKind::VideoAssetAudio,
                _ => {
                    sink.report(
                        DiagnosticKind::UnsupportedAsset,
                        track,
                        Some(clip),
                        format!("asset '{}' has no audio to place on an audio track", clip.asset),
                    )?;
                    continue;
                }
            };
            audio.push(audio_clip(
                source_kind,
                track,
                clip,
                window,
                ov,
                (fade_in, fade_out),
                sink,
            )?);
        }
    }
    Ok(())
}

fn clip_window(clip: &Clip) -> Option<ClipWindow> {
    let t = clip.time;
    if !t.start.is_finite() || !t.end.is_finite() || t.end <= t.start {
        return None;
    }
    let start = secs_to_us(t.start);
    let end = secs_to_us(t.end);
    if end <= start {
        return None;
    }

    let (source_start, source_end) = match clip.source_range {
        Some(r) => {
            let s = if r.start.is_finite() { r.start.max(0.0) } else { 0.0 };
            let e = (r.end.is_finite() && r.end > s).then(|| secs_to_us(r.end));
            (secs_to_us(s), e)
        }
        None => (TimeUs::ZERO, None),
    };

    Some(ClipWindow {
        start,
        end,
        source_start,
        source_end,
    })
}

/// Outgoing transition length of `clip` in TimeUs; zero for none, non-finite or negative.
fn transition_len(clip: Option<&Clip>) -> TimeUs {
    clip.and_then(|c| c.transition_out.as_ref())
        .map(|t| t.duration)
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(secs_to_us)
        .unwrap_or(TimeUs::ZERO)
}

fn transition_window(clip: &Clip, window: ClipWindow) -> Option<TransitionWindow> {
    let tr = clip.transition_out.as_ref()?;
    let len = transition_len(Some(clip));
    if len == TimeUs::ZERO {
        return None;
    }
    Some(TransitionWindow {
        kind: tr.kind.clone(),
        start_us: (window.end - len).max(window.start),
        end_us: window.end,
        easing: tr.easing.unwrap_or(Ease::Linear),
    })
}

fn normalize_warp(
    def: Option<&TimeWarpDef>,
    window: ClipWindow,
    track: &Track,
    clip: &Clip,
    sink: &mut DiagnosticSink,
) -> VeirResult<Option<TimeWarpPlan>> {
    let Some(def) = def else {
        return Ok(None);
    };
    let (plan, dropped) = normalize_time_warp(def, window.end - window.start);
    for msg in dropped {
        sink.report(DiagnosticKind::MalformedTimeWarp, track, Some(clip), msg)?;
    }
    Ok(plan)
}

fn audio_clip(
    source_kind: AudioSourceKind,
    track: &Track,
    clip: &Clip,
    window: ClipWindow,
    ov: Option<&ClipOverride>,
    (fade_in, fade_out): (TimeUs, TimeUs),
    sink: &mut DiagnosticSink,
) -> VeirResult<AudioClipPlan> {
    let audio_ov = ov.and_then(|o| o.audio.as_ref());
    // Embedded audio follows the picture's speed unless it carries its own warp.
    let warp_def = audio_ov
        .and_then(|a| a.time_warp.as_ref())
        .or_else(|| match source_kind {
            AudioSourceKind::VideoAssetAudio => ov
                .and_then(|o| o.video.as_ref())
                .and_then(|v| v.time_warp.as_ref()),
            AudioSourceKind::AudioAsset => None,
        });

    Ok(AudioClipPlan {
        clip_id: clip.id.clone(),
        asset_id: clip.asset.clone(),
        track_id: track.id.clone(),
        source_kind,
        start_us: window.start,
        end_us: window.end,
        source_start_us: window.source_start,
        source_end_us: window.source_end,
        gain: sanitize_gain(audio_ov.and_then(|a| a.gain)),
        muted: audio_ov.and_then(|a| a.muted).unwrap_or(false),
        fade_in_us: fade_in,
        fade_out_us: fade_out,
        maintain_pitch: audio_ov.and_then(|a| a.maintain_pitch).unwrap_or(true),
        time_warp: normalize_warp(warp_def, window, track, clip, sink)?,
    })
}

fn sanitize_gain(gain: Option<f64>) -> f64 {
    match gain {
        Some(g) if g.is_finite() => g.max(0.0),
        _ => 1.0,
    }
}

fn build_audio_graph(
    project: &Project,
    audio_out: AudioOutputOptions,
    clips: Vec<AudioClipPlan>,
) -> AudioGraphPlan {
    let tracks_by_id: BTreeMap<&str, &Track> = project
        .timeline
        .tracks
        .iter()
        .map(|t| (t.id.as_str(), t))
        .collect();
    let contributing: BTreeSet<&str> = clips.iter().map(|c| c.track_id.as_str()).collect();

    let mut buses = Vec::with_capacity(contributing.len() + 1);
    for &track_id in &contributing {
        let settings = tracks_by_id.get(track_id).and_then(|t| t.audio.as_ref());
        let ducking = settings
            .and_then(|s| s.ducking.as_ref())
            .filter(|d| {
                let usable = d.sidechain_track_id != track_id
                    && contributing.contains(d.sidechain_track_id.as_str());
                if !usable {
                    tracing::debug!(
                        track = track_id,
                        sidechain = %d.sidechain_track_id,
                        "ignoring ducking: sidechain track has no audio bus"
                    );
                }
                usable
            })
            .map(|d| DuckingPlan {
                sidechain_bus_id: track_bus_id(&d.sidechain_track_id),
                amount: if d.amount.is_finite() {
                    d.amount.clamp(0.0, 1.0)
                } else {
                    0.0
                },
                attack_us: non_negative_us(d.attack),
                release_us: non_negative_us(d.release),
            });

        buses.push(AudioBusPlan {
            id: track_bus_id(track_id),
            kind: BusKind::Track,
            track_id: Some(track_id.to_owned()),
            gain: sanitize_gain(settings.and_then(|s| s.gain)),
            muted: settings.and_then(|s| s.muted).unwrap_or(false),
            ducking,
        });
    }
    buses.sort_by(|a, b| a.id.cmp(&b.id));
    buses.push(AudioBusPlan {
        id: MASTER_BUS_ID.to_owned(),
        kind: BusKind::Master,
        track_id: None,
        gain: 1.0,
        muted: false,
        ducking: None,
    });

    let routes = clips
        .iter()
        .map(|c| AudioRoute {
            clip_id: c.clip_id.clone(),
            bus_id: track_bus_id(&c.track_id),
            send: 1.0,
        })
        .collect();

    AudioGraphPlan {
        sample_rate: audio_out.sample_rate,
        channels: audio_out.channels,
        sample_format: SampleFormat::F32Planar,
        buses,
        clips,
        routes,
        master_bus_id: MASTER_BUS_ID.to_owned(),
    }
}

fn non_negative_us(secs: f64) -> TimeUs {
    if secs.is_finite() && secs > 0.0 {
        secs_to_us(secs)
    } else {
        TimeUs::ZERO
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
