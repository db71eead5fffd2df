use crate::animation::ease::Ease;
use crate::compile::plan::{
    AudioBusPlan, AudioClipPlan, AudioGraphPlan, AudioSourceKind, BusKind, RenderPlan,
    TimeWarpPlan, VideoClipPlan,
};
use crate::foundation::timebase::TimeUs;
use crate::project::model::{TimeWarpMode, TrackKind};
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5e1c_0a7d_93b2_f41e;

/// Stable 128-bit content hash of a [`RenderPlan`].
///
/// Equal plans always hash equal, across runs and machines. Preview and export passes use it to
/// detect that a recompile changed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PlanFingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl std::fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

impl RenderPlan {
    /// Stable content fingerprint of this plan.
    pub fn fingerprint(&self) -> PlanFingerprint {
        let mut h = StableHasher::new();
        write_plan(&mut h, self);
        h.finish()
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        // Fold -0.0 into 0.0 so sign-of-zero noise does not change the hash.
        let v = if v == 0.0 { 0.0 } else { v };
        self.write_u64(v.to_bits());
    }

    fn write_time(&mut self, t: TimeUs) {
        self.write_i64(t.0);
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    fn write_opt_time(&mut self, t: Option<TimeUs>) {
        match t {
            Some(t) => {
                self.write_u8(1);
                self.write_time(t);
            }
            None => self.write_u8(0),
        }
    }

    fn finish(self) -> PlanFingerprint {
        let v = self.inner.digest128();
        PlanFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

fn write_plan(h: &mut StableHasher, plan: &RenderPlan) {
    h.write_str(&plan.version);
    h.write_str(&plan.timebase);
    h.write_f64(plan.meta.fps);
    h.write_time(plan.meta.duration_us);
    h.write_u64(plan.meta.frame_count);
    h.write_u32(plan.meta.width);
    h.write_u32(plan.meta.height);
    h.write_u32(plan.meta.audio.sample_rate);
    h.write_u16(plan.meta.audio.channels);

    h.write_u64(plan.video.len() as u64);
    for clip in &plan.video {
        write_video_clip(h, clip);
    }
    write_audio_graph(h, &plan.audio);
}

fn write_video_clip(h: &mut StableHasher, c: &VideoClipPlan) {
    h.write_str(&c.clip_id);
    h.write_str(&c.asset_id);
    h.write_str(&c.track_id);
    h.write_u8(match c.track_kind {
        TrackKind::Video => 0,
        TrackKind::Pip => 1,
        TrackKind::Audio => 2,
        TrackKind::Other => 3,
    });
    h.write_i64(i64::from(c.layer));
    h.write_time(c.start_us);
    h.write_time(c.end_us);
    h.write_time(c.source_start_us);
    h.write_opt_time(c.source_end_us);
    match &c.transition_out {
        Some(t) => {
            h.write_u8(1);
            h.write_str(&t.kind);
            h.write_time(t.start_us);
            h.write_time(t.end_us);
            write_ease(h, Some(t.easing));
        }
        None => h.write_u8(0),
    }
    write_time_warp(h, c.time_warp.as_ref());
}

fn write_audio_graph(h: &mut StableHasher, g: &AudioGraphPlan) {
    h.write_u32(g.sample_rate);
    h.write_u16(g.channels);
    h.write_str(&g.master_bus_id);

    h.write_u64(g.buses.len() as u64);
    for bus in &g.buses {
        write_bus(h, bus);
    }
    h.write_u64(g.clips.len() as u64);
    for clip in &g.clips {
        write_audio_clip(h, clip);
    }
    h.write_u64(g.routes.len() as u64);
    for r in &g.routes {
        h.write_str(&r.clip_id);
        h.write_str(&r.bus_id);
        h.write_f64(r.send);
    }
}

fn write_bus(h: &mut StableHasher, b: &AudioBusPlan) {
    h.write_str(&b.id);
    h.write_u8(match b.kind {
        BusKind::Track => 0,
        BusKind::Master => 1,
    });
    match &b.track_id {
        Some(id) => {
            h.write_u8(1);
            h.write_str(id);
        }
        None => h.write_u8(0),
    }
    h.write_f64(b.gain);
    h.write_bool(b.muted);
    match &b.ducking {
        Some(d) => {
            h.write_u8(1);
            h.write_str(&d.sidechain_bus_id);
            h.write_f64(d.amount);
            h.write_time(d.attack_us);
            h.write_time(d.release_us);
        }
        None => h.write_u8(0),
    }
}

fn write_audio_clip(h: &mut StableHasher, c: &AudioClipPlan) {
    h.write_str(&c.clip_id);
    h.write_str(&c.asset_id);
    h.write_str(&c.track_id);
    h.write_u8(match c.source_kind {
        AudioSourceKind::AudioAsset => 0,
        AudioSourceKind::VideoAssetAudio => 1,
    });
    h.write_time(c.start_us);
    h.write_time(c.end_us);
    h.write_time(c.source_start_us);
    h.write_opt_time(c.source_end_us);
    h.write_f64(c.gain);
    h.write_bool(c.muted);
    h.write_time(c.fade_in_us);
    h.write_time(c.fade_out_us);
    h.write_bool(c.maintain_pitch);
    write_time_warp(h, c.time_warp.as_ref());
}

fn write_time_warp(h: &mut StableHasher, tw: Option<&TimeWarpPlan>) {
    let Some(tw) = tw else {
        h.write_u8(0);
        return;
    };
    h.write_u8(1);
    h.write_u8(match tw.mode {
        TimeWarpMode::Hold => 0,
        TimeWarpMode::Ramp => 1,
    });
    h.write_u64(tw.segments.len() as u64);
    for s in &tw.segments {
        h.write_time(s.start_us);
        h.write_time(s.end_us);
        h.write_f64(s.speed);
        write_ease(h, s.easing);
    }
}

fn write_ease(h: &mut StableHasher, e: Option<Ease>) {
    h.write_u8(match e {
        None => 0,
        Some(Ease::Linear) => 1,
        Some(Ease::InQuad) => 2,
        Some(Ease::OutQuad) => 3,
        Some(Ease::InOutQuad) => 4,
        Some(Ease::InCubic) => 5,
        Some(Ease::OutCubic) => 6,
        Some(Ease::InOutCubic) => 7,
    });
}
