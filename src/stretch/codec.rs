use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};

use anyhow::Context as _;

use crate::foundation::error::{VeirError, VeirResult};

/// Pitch-preserving speed-change primitive driven by the high-quality backend.
///
/// Implementations run on the background stretch context and are called one request at a time,
/// so they need not be reentrant.
pub trait SpeedCodec: Send + 'static {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Prepare the codec. Called once, before any [`SpeedCodec::change_speed`].
    fn init(&mut self) -> VeirResult<()>;

    /// Inclusive speed range a single [`SpeedCodec::change_speed`] call supports.
    fn speed_range(&self) -> (f64, f64);

    /// Play planar `input` back at `speed` (input duration over output duration) without
    /// changing pitch. Output is roughly `input_len / speed` frames per channel.
    fn change_speed(
        &mut self,
        sample_rate: u32,
        input: &[Vec<f32>],
        speed: f64,
    ) -> VeirResult<Vec<Vec<f32>>>;
}

/// [`SpeedCodec`] backed by the system `ffmpeg` and its `atempo` filter.
#[derive(Clone, Debug, Default)]
pub struct FfmpegAtempoCodec {
    ready: bool,
}

impl FfmpegAtempoCodec {
    /// Native range of one `atempo` instance.
    pub const SPEED_RANGE: (f64, f64) = (0.5, 2.0);

    /// Create an uninitialized codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeedCodec for FfmpegAtempoCodec {
    fn name(&self) -> &str {
        "ffmpeg-atempo"
    }

    fn init(&mut self) -> VeirResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(VeirError::stretch(
                "ffmpeg is required for pitch-preserving stretch, but was not found on PATH",
            ));
        }
        self.ready = true;
        Ok(())
    }

    fn speed_range(&self) -> (f64, f64) {
        Self::SPEED_RANGE
    }

    fn change_speed(
        &mut self,
        sample_rate: u32,
        input: &[Vec<f32>],
        speed: f64,
    ) -> VeirResult<Vec<Vec<f32>>> {
        if !self.ready {
            return Err(VeirError::stretch("ffmpeg-atempo codec used before init"));
        }
        let (lo, hi) = Self::SPEED_RANGE;
        if !(lo..=hi).contains(&speed) {
            return Err(VeirError::stretch(format!(
                "atempo speed {speed} outside native range [{lo}, {hi}]"
            )));
        }
        let channels = input.len();
        if channels == 0 || input[0].is_empty() {
            return Ok(vec![Vec::new(); channels]);
        }
        let bytes = interleave_f32le(input)?;
        let out = run_atempo(sample_rate, channels, speed, bytes)?;
        Ok(deinterleave_f32le(&out, channels))
    }
}

fn run_atempo(sample_rate: u32, channels: usize, speed: f64, bytes: Vec<u8>) -> VeirResult<Vec<u8>> {
    let rate = sample_rate.to_string();
    let ch = channels.to_string();
    let mut child = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error"])
        .args(["-f", "f32le", "-ar", &rate, "-ac", &ch, "-i", "pipe:0"])
        .args(["-filter:a", &format!("atempo={speed}")])
        .args(["-f", "f32le", "-ar", &rate, "-ac", &ch, "pipe:1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to spawn ffmpeg for atempo")?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| VeirError::stretch("failed to open ffmpeg stdin (unexpected)"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| VeirError::stretch("failed to open ffmpeg stdout (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| VeirError::stretch("failed to open ffmpeg stderr (unexpected)"))?;

    // ffmpeg starts writing before it has read everything, so feed and drain concurrently.
    let writer = std::thread::spawn(move || stdin.write_all(&bytes));
    let stderr_drain = std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok::<_, std::io::Error>(stderr_bytes)
    });

    let (out, status) = collect_or_reap(&mut child, &mut stdout)?;

    let written = writer
        .join()
        .map_err(|_| VeirError::stretch("ffmpeg stdin writer thread panicked"))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| VeirError::stretch("ffmpeg stderr drain thread panicked"))?
        .context("ffmpeg stderr read failed")?;

    // A failed ffmpeg also breaks the stdin pipe; its own message is the useful one.
    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        return Err(VeirError::stretch(format!(
            "ffmpeg exited with status {}: {}",
            status,
            stderr.trim()
        )));
    }
    written.context("failed to write samples to ffmpeg stdin")?;
    Ok(out)
}

/// Read `stdout` to the end and wait for `child`.
///
/// On failure the child is killed and reaped before returning; that also breaks its stdin pipe,
/// so a writer thread blocked on it gets an error and exits.
fn collect_or_reap(child: &mut Child, stdout: &mut impl Read) -> VeirResult<(Vec<u8>, ExitStatus)> {
    let mut out = Vec::new();
    let collected = stdout
        .read_to_end(&mut out)
        .context("failed to read ffmpeg stdout")
        .and_then(|_| child.wait().context("failed to wait for ffmpeg"));
    match collected {
        Ok(status) => Ok((out, status)),
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            Err(e.into())
        }
    }
}

fn interleave_f32le(input: &[Vec<f32>]) -> VeirResult<Vec<u8>> {
    let frames = input[0].len();
    if input.iter().any(|c| c.len() != frames) {
        return Err(VeirError::validation("planar channels must have equal length"));
    }
    let mut bytes = Vec::with_capacity(frames * input.len() * 4);
    for i in 0..frames {
        for channel in input {
            bytes.extend_from_slice(&channel[i].to_le_bytes());
        }
    }
    Ok(bytes)
}

fn deinterleave_f32le(bytes: &[u8], channels: usize) -> Vec<Vec<f32>> {
    let frames = bytes.len() / (4 * channels);
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in bytes.chunks_exact(4 * channels) {
        for (c, sample) in frame.chunks_exact(4).enumerate() {
            out[c].push(f32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]));
        }
    }
    out
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/codec.rs"]
mod tests;
