use tokio::sync::OnceCell;

use crate::foundation::error::{VeirError, VeirResult};
use crate::stretch::StretchRequest;
use crate::stretch::codec::SpeedCodec;
use crate::stretch::ratio::{input_frames_for_curve, sample_ratio_curve};
use crate::stretch::segment::{SegmentTuning, chain_speed_steps, segment_ratio_curve};
use crate::stretch::transport::{
    StretchJob, StretchTransport, WorkerRequest, WorkerResponse, pack_planar, unpack_planar,
};

/// Pitch-preserving stretcher running a [`SpeedCodec`] on its own background context.
pub(crate) struct HighQualityStretcher {
    transport: StretchTransport,
    init: OnceCell<Result<(), String>>,
    codec_name: String,
}

impl HighQualityStretcher {
    /// Start the background context. The codec is not initialized yet; see [`Self::init`].
    pub(crate) fn spawn(codec: Box<dyn SpeedCodec>) -> VeirResult<Self> {
        let codec_name = codec.name().to_owned();
        let mut worker = CodecWorker {
            codec,
            ready: false,
        };
        let transport = StretchTransport::spawn(move |req| worker.handle(req))?;
        Ok(Self {
            transport,
            init: OnceCell::new(),
            codec_name,
        })
    }

    pub(crate) fn codec_name(&self) -> &str {
        &self.codec_name
    }

    /// Initialize the codec once. Concurrent callers share the one in-flight initialization, and
    /// its outcome (success or failure) is final.
    pub(crate) async fn init(&self) -> VeirResult<()> {
        let outcome = self
            .init
            .get_or_init(|| async {
                tracing::debug!(codec = %self.codec_name, "initializing stretch codec");
                match self
                    .transport
                    .call(|request_id| WorkerRequest::Init { request_id })
                    .await
                {
                    Ok(WorkerResponse::InitOk { .. }) => Ok(()),
                    Ok(WorkerResponse::InitError { message, .. }) => Err(message),
                    Ok(_) => Err("unexpected response to init".to_owned()),
                    Err(e) => Err(e.to_string()),
                }
            })
            .await;
        outcome
            .clone()
            .map_err(|message| VeirError::stretch(format!("{} init failed: {message}", self.codec_name)))
    }

    /// Stretch one request on the background context.
    pub(crate) async fn stretch(
        &self,
        req: &StretchRequest<'_>,
        tuning: SegmentTuning,
    ) -> VeirResult<Vec<Vec<f32>>> {
        let input_frames = validate(req)?;
        self.init().await?;

        let ratio_curve = sample_ratio_curve(req.ratio_at, req.output_frames, req.sample_rate);
        let input_planar = pack_planar(req.input);
        let (sample_rate, channels, output_frames) =
            (req.sample_rate, req.channels, req.output_frames);

        let resp = self
            .transport
            .call(move |request_id| {
                WorkerRequest::Stretch(StretchJob {
                    request_id,
                    sample_rate,
                    channels,
                    input_planar,
                    input_frames,
                    output_frames,
                    ratio_curve,
                    tuning,
                })
            })
            .await?;

        match resp {
            WorkerResponse::StretchOk {
                output_planar,
                output_frames,
                channels,
                ..
            } => unpack_planar(&output_planar, usize::from(channels), output_frames),
            WorkerResponse::StretchError { message, .. } => Err(VeirError::stretch(message)),
            WorkerResponse::InitOk { request_id } | WorkerResponse::InitError { request_id, .. } => {
                Err(VeirError::transport(format!(
                    "init response delivered to stretch request {request_id}"
                )))
            }
        }
    }

    /// Tear down the background context, rejecting anything in flight.
    pub(crate) fn destroy(&self) {
        self.transport.shutdown();
    }
}

/// Check shape and return the input length in frames.
fn validate(req: &StretchRequest<'_>) -> VeirResult<usize> {
    if req.sample_rate == 0 {
        return Err(VeirError::validation("stretch sample_rate must be non-zero"));
    }
    if req.channels == 0 || usize::from(req.channels) != req.input.len() {
        return Err(VeirError::validation(format!(
            "stretch request declares {} channels but carries {} buffers",
            req.channels,
            req.input.len()
        )));
    }
    let frames = req.input[0].len();
    if req.input.iter().any(|c| c.len() != frames) {
        return Err(VeirError::validation("planar channels must have equal length"));
    }
    Ok(frames)
}

/// Codec state owned by the worker thread.
struct CodecWorker {
    codec: Box<dyn SpeedCodec>,
    ready: bool,
}

impl CodecWorker {
    fn handle(&mut self, req: WorkerRequest) -> WorkerResponse {
        match req {
            WorkerRequest::Init { request_id } => {
                if !self.ready
                    && let Err(e) = self.codec.init()
                {
                    return WorkerResponse::InitError {
                        request_id,
                        message: e.to_string(),
                    };
                }
                self.ready = true;
                WorkerResponse::InitOk { request_id }
            }
            WorkerRequest::Stretch(job) => {
                let request_id = job.request_id;
                tracing::debug!(
                    request_id,
                    input_frames = job.input_frames,
                    output_frames = job.output_frames,
                    "stretch job"
                );
                match process_job(self.codec.as_mut(), &job) {
                    Ok(output_planar) => WorkerResponse::StretchOk {
                        request_id,
                        output_planar,
                        output_frames: job.output_frames,
                        channels: job.channels,
                    },
                    Err(e) => WorkerResponse::StretchError {
                        request_id,
                        message: e.to_string(),
                    },
                }
            }
        }
    }
}

/// Render one job segment by segment and return the packed output.
///
/// Segments run strictly in order. Each consumes the next stretch of input its part of the ratio
/// curve calls for and writes into its own output range only, so a codec that under-produces
/// leaves silence instead of shifting later segments.
pub(crate) fn process_job(codec: &mut dyn SpeedCodec, job: &StretchJob) -> VeirResult<Vec<f32>> {
    let channels = usize::from(job.channels);
    let input = unpack_planar(&job.input_planar, channels, job.input_frames)?;
    let mut output = vec![vec![0.0f32; job.output_frames]; channels];
    let (lo, hi) = codec.speed_range();

    let mut consumed = 0.0f64;
    for seg in segment_ratio_curve(&job.ratio_curve, job.sample_rate, &job.tuning) {
        let from = (consumed.round() as usize).min(job.input_frames);
        consumed += input_frames_for_curve(&job.ratio_curve[seg.start..seg.end()]);
        let to = (consumed.round() as usize).min(job.input_frames);
        if to <= from {
            continue;
        }

        let mut buf: Vec<Vec<f32>> = input.iter().map(|c| c[from..to].to_vec()).collect();
        for step in chain_speed_steps(1.0 / seg.ratio, lo, hi) {
            if (step - 1.0).abs() > 1e-9 {
                buf = codec.change_speed(job.sample_rate, &buf, step)?;
            }
        }

        for (dst, src) in output.iter_mut().zip(&buf) {
            let n = src.len().min(seg.len);
            for (d, s) in dst[seg.start..seg.start + n].iter_mut().zip(&src[..n]) {
                *d = if s.is_finite() { *s } else { 0.0 };
            }
        }
    }
    Ok(pack_planar(&output))
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/hq.rs"]
mod tests;
