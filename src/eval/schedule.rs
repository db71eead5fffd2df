use crate::compile::plan::{AudioClipPlan, RenderPlan, VideoClipPlan};
use crate::foundation::timebase::{TimeUs, frame_to_us, sample_to_us, us_to_samples_ceil};

/// Default audio chunk size in sample frames.
pub const DEFAULT_AUDIO_CHUNK_FRAMES: u32 = 2048;

/// Options for [`build_schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleOpts {
    /// Sample frames per audio chunk; `0` is treated as `1`.
    pub audio_chunk_frames: u32,
}

impl Default for ScheduleOpts {
    fn default() -> Self {
        Self {
            audio_chunk_frames: DEFAULT_AUDIO_CHUNK_FRAMES,
        }
    }
}

/// One output video frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFrameInstant {
    /// Frame index.
    pub index: u64,
    /// Presentation time, `round(index * 1e6 / fps)`.
    pub time_us: TimeUs,
}

/// One audio chunk the mixer renders in a single pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunk {
    /// Chunk index.
    pub index: u64,
    /// First sample frame of the chunk.
    pub start_sample: u64,
    /// Sample frames in the chunk; only the last chunk may be shorter than requested.
    pub frames: u32,
    /// Time of `start_sample`.
    pub start_us: TimeUs,
}

impl AudioChunk {
    /// One past the last sample frame of the chunk.
    pub fn end_sample(&self) -> u64 {
        self.start_sample + u64::from(self.frames)
    }
}

/// Frame-by-frame and chunk-by-chunk timing of a plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// One entry per frame in `[0, frame_count)`.
    pub video_frames: Vec<VideoFrameInstant>,
    /// Chunks exactly tiling `[0, total_samples)`.
    pub audio_chunks: Vec<AudioChunk>,
}

impl Schedule {
    /// Total sample frames covered by the audio chunks.
    pub fn total_samples(&self) -> u64 {
        self.audio_chunks.last().map_or(0, AudioChunk::end_sample)
    }
}

/// Expand a plan into its video frame and audio chunk grids.
///
/// Pure and infallible. Frame times come straight from the index so there is no drift; audio
/// covers `ceil(duration_us * sample_rate / 1e6)` samples.
#[tracing::instrument(skip(plan), fields(frames = plan.meta.frame_count))]
pub fn build_schedule(plan: &RenderPlan, opts: &ScheduleOpts) -> Schedule {
    let fps = plan.meta.fps;
    let video_frames = (0..plan.meta.frame_count)
        .map(|index| VideoFrameInstant {
            index,
            time_us: frame_to_us(index, fps),
        })
        .collect();

    let sample_rate = plan.audio.sample_rate;
    let chunk = u64::from(opts.audio_chunk_frames.max(1));
    let total = us_to_samples_ceil(plan.meta.duration_us, sample_rate);
    let mut audio_chunks = Vec::with_capacity(total.div_ceil(chunk) as usize);
    let mut start = 0u64;
    while start < total {
        let frames = chunk.min(total - start);
        audio_chunks.push(AudioChunk {
            index: audio_chunks.len() as u64,
            start_sample: start,
            // `frames <= chunk`, which came from a u32.
            frames: frames as u32,
            start_us: sample_to_us(start, sample_rate),
        });
        start += frames;
    }

    tracing::debug!(
        video_frames = plan.meta.frame_count,
        audio_chunks = audio_chunks.len(),
        total_samples = total,
        "built schedule"
    );
    Schedule {
        video_frames,
        audio_chunks,
    }
}

/// Video clips covering `t`, in paint order (lowest layer first).
pub fn active_video_clips(plan: &RenderPlan, t: TimeUs) -> Vec<&VideoClipPlan> {
    plan.video
        .iter()
        .filter(|c| c.start_us <= t && t < c.end_us)
        .collect()
}

/// Audio clips overlapping the time span of `chunk` at `sample_rate`, in plan order.
pub fn audio_clips_in_chunk<'a>(
    plan: &'a RenderPlan,
    chunk: &AudioChunk,
    sample_rate: u32,
) -> Vec<&'a AudioClipPlan> {
    let from = sample_to_us(chunk.start_sample, sample_rate);
    let to = sample_to_us(chunk.end_sample(), sample_rate);
    plan.audio
        .clips
        .iter()
        .filter(|c| c.start_us < to && from < c.end_us)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/eval/schedule.rs"]
mod tests;
