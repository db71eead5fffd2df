use super::*;
use crate::foundation::timebase::TimeUs;
use crate::stretch::StretchQuality;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Probe {
    inits: Arc<AtomicUsize>,
    speeds: Arc<Mutex<Vec<f64>>>,
}

impl Probe {
    fn speeds(&self) -> Vec<f64> {
        self.speeds.lock().unwrap().clone()
    }
}

/// Nearest-sample resampler standing in for a real pitch-preserving codec.
struct ResampleCodec {
    probe: Probe,
    fail_init: bool,
    fail_above: f64,
    yield_fraction: f64,
}

impl ResampleCodec {
    fn new(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
            fail_init: false,
            fail_above: f64::INFINITY,
            yield_fraction: 1.0,
        }
    }
}

impl SpeedCodec for ResampleCodec {
    fn name(&self) -> &str {
        "resample"
    }

    fn init(&mut self) -> VeirResult<()> {
        self.probe.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(VeirError::stretch("codec runtime missing"));
        }
        Ok(())
    }

    fn speed_range(&self) -> (f64, f64) {
        (0.5, 2.0)
    }

    fn change_speed(
        &mut self,
        _sample_rate: u32,
        input: &[Vec<f32>],
        speed: f64,
    ) -> VeirResult<Vec<Vec<f32>>> {
        if !(0.5..=2.0).contains(&speed) {
            return Err(VeirError::stretch(format!("speed {speed} out of range")));
        }
        if speed > self.fail_above {
            return Err(VeirError::stretch(format!("refusing speed {speed}")));
        }
        self.probe.speeds.lock().unwrap().push(speed);
        Ok(input
            .iter()
            .map(|c| {
                let n = c.len();
                let len = ((n as f64 / speed).round() * self.yield_fraction) as usize;
                (0..len)
                    .map(|i| c[((i as f64 * speed) as usize).min(n - 1)])
                    .collect()
            })
            .collect())
    }
}

fn job(input: &[Vec<f32>], output_frames: usize, ratio_curve: Vec<f64>) -> StretchJob {
    StretchJob {
        request_id: 1,
        sample_rate: 1_000,
        channels: input.len() as u16,
        input_planar: pack_planar(input),
        input_frames: input[0].len(),
        output_frames,
        ratio_curve,
        tuning: SegmentTuning::default(),
    }
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32).collect()
}

#[test]
fn speeds_outside_native_range_are_chained() {
    let probe = Probe::default();
    let mut codec = ResampleCodec::new(&probe);
    let input = vec![vec![1.0f32; 4_000], vec![-1.0f32; 4_000]];
    let packed = process_job(&mut codec, &job(&input, 1_000, vec![0.25; 1_000])).unwrap();

    let speeds = probe.speeds();
    // Two channels' worth of work happens in one call per step.
    assert_eq!(speeds.len(), 2);
    assert!(speeds.iter().all(|s| (s - 2.0).abs() < 1e-9));

    let out = unpack_planar(&packed, 2, 1_000).unwrap();
    assert!(out[0].iter().all(|&v| v == 1.0));
    assert!(out[1].iter().all(|&v| v == -1.0));
}

#[test]
fn under_production_leaves_silence_without_shifting() {
    let probe = Probe::default();
    let mut codec = ResampleCodec::new(&probe);
    codec.yield_fraction = 0.5;

    let mut curve = vec![0.5; 500];
    curve.extend(vec![1.0; 500]);
    let input = vec![ramp(2_000)];
    let packed = process_job(&mut codec, &job(&input, 1_000, curve)).unwrap();
    let out = &unpack_planar(&packed, 1, 1_000).unwrap()[0];

    // First segment: 1000 input frames at 2x, codec returns only 250 of 500 frames.
    assert_eq!(out[0], 0.0);
    assert_eq!(out[1], 2.0);
    assert!(out[250..500].iter().all(|&v| v == 0.0));
    // Second segment still starts at input frame 1000 and output frame 500.
    assert_eq!(out[500], 1_000.0);
    assert_eq!(out[999], 1_499.0);
}

#[test]
fn exhausted_input_is_silence() {
    let probe = Probe::default();
    let mut codec = ResampleCodec::new(&probe);
    let input = vec![ramp(100)];
    let packed = process_job(&mut codec, &job(&input, 300, vec![1.0; 300])).unwrap();
    let out = &unpack_planar(&packed, 1, 300).unwrap()[0];
    assert_eq!(out[99], 99.0);
    assert!(out[100..].iter().all(|&v| v == 0.0));
    assert!(probe.speeds().is_empty());
}

#[tokio::test]
async fn concurrent_init_runs_once() {
    let probe = Probe::default();
    let hq = HighQualityStretcher::spawn(Box::new(ResampleCodec::new(&probe))).unwrap();
    let (a, b) = tokio::join!(hq.init(), hq.init());
    a.unwrap();
    b.unwrap();
    hq.init().await.unwrap();
    assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
    assert_eq!(hq.codec_name(), "resample");
    hq.destroy();
}

#[tokio::test]
async fn init_failure_is_final() {
    let probe = Probe::default();
    let mut codec = ResampleCodec::new(&probe);
    codec.fail_init = true;
    let hq = HighQualityStretcher::spawn(Box::new(codec)).unwrap();
    let (a, b) = tokio::join!(hq.init(), hq.init());
    assert!(a.unwrap_err().to_string().contains("codec runtime missing"));
    assert!(b.is_err());
    assert!(hq.init().await.is_err());
    assert_eq!(probe.inits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stretch_round_trips_through_the_worker() {
    let probe = Probe::default();
    let hq = HighQualityStretcher::spawn(Box::new(ResampleCodec::new(&probe))).unwrap();
    let input = vec![vec![0.25f32; 2_000], vec![0.5f32; 2_000]];
    let half = |_: TimeUs| 0.5;
    let req = StretchRequest {
        sample_rate: 1_000,
        channels: 2,
        input: &input,
        output_frames: 1_000,
        ratio_at: &half,
        quality: StretchQuality::Balanced,
    };
    let out = hq.stretch(&req, SegmentTuning::default()).await.unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].len(), 1_000);
    assert!(out[1].iter().all(|&v| v == 0.5));
    assert!(probe.speeds().iter().all(|s| (s - 2.0).abs() < 1e-9));
}

#[tokio::test]
async fn codec_errors_fail_only_their_request() {
    let probe = Probe::default();
    let mut codec = ResampleCodec::new(&probe);
    codec.fail_above = 1.5;
    let hq = HighQualityStretcher::spawn(Box::new(codec)).unwrap();
    let input = vec![vec![0.0f32; 2_000]];

    let fast = |_: TimeUs| 0.5;
    let bad = StretchRequest {
        sample_rate: 1_000,
        channels: 1,
        input: &input,
        output_frames: 1_000,
        ratio_at: &fast,
        quality: StretchQuality::Balanced,
    };
    let gentle = |_: TimeUs| 0.8;
    let good = StretchRequest {
        ratio_at: &gentle,
        ..bad
    };

    let (bad, good) = tokio::join!(
        hq.stretch(&bad, SegmentTuning::default()),
        hq.stretch(&good, SegmentTuning::default())
    );
    assert!(matches!(bad, Err(VeirError::Stretch(_))));
    assert_eq!(good.unwrap()[0].len(), 1_000);
}

#[tokio::test]
async fn malformed_requests_are_rejected_up_front() {
    let probe = Probe::default();
    let hq = HighQualityStretcher::spawn(Box::new(ResampleCodec::new(&probe))).unwrap();
    let input = vec![vec![0.0f32; 10], vec![0.0f32; 9]];
    let one = |_: TimeUs| 1.0;
    let req = StretchRequest {
        sample_rate: 1_000,
        channels: 2,
        input: &input,
        output_frames: 10,
        ratio_at: &one,
        quality: StretchQuality::Balanced,
    };
    assert!(matches!(
        hq.stretch(&req, SegmentTuning::default()).await,
        Err(VeirError::Validation(_))
    ));
    let req = StretchRequest { channels: 3, ..req };
    assert!(matches!(
        hq.stretch(&req, SegmentTuning::default()).await,
        Err(VeirError::Validation(_))
    ));
    // Validation happens before init.
    assert_eq!(probe.inits.load(Ordering::SeqCst), 0);
}
