use super::*;
use std::sync::Arc;

fn echo_handler(req: WorkerRequest) -> WorkerResponse {
    match req {
        WorkerRequest::Init { request_id } => WorkerResponse::InitOk { request_id },
        WorkerRequest::Stretch(job) if job.output_frames == 0 => WorkerResponse::StretchError {
            request_id: job.request_id,
            message: "nothing to do".to_owned(),
        },
        WorkerRequest::Stretch(job) => WorkerResponse::StretchOk {
            request_id: job.request_id,
            output_planar: job.input_planar,
            output_frames: job.input_frames,
            channels: job.channels,
        },
    }
}

fn job(request_id: RequestId, input: &[Vec<f32>], output_frames: usize) -> WorkerRequest {
    WorkerRequest::Stretch(StretchJob {
        request_id,
        sample_rate: 8_000,
        channels: input.len() as u16,
        input_planar: pack_planar(input),
        input_frames: input.first().map_or(0, Vec::len),
        output_frames,
        ratio_curve: vec![1.0; output_frames],
        tuning: SegmentTuning::default(),
    })
}

#[test]
fn pack_is_channel_major() {
    let planar = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
    let packed = pack_planar(&planar);
    assert_eq!(packed, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(unpack_planar(&packed, 3, 2).unwrap(), planar);
    assert_eq!(unpack_planar(&[], 2, 0).unwrap(), vec![Vec::<f32>::new(); 2]);
}

#[test]
fn unpack_rejects_wrong_length() {
    let err = unpack_planar(&[0.0; 5], 2, 3).unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn responses_are_matched_by_id() {
    let t = StretchTransport::spawn(echo_handler).unwrap();
    let a = vec![vec![1.0f32; 4]];
    let b = vec![vec![2.0f32; 8], vec![3.0f32; 8]];

    let (ra, rb) = tokio::join!(t.call(|id| job(id, &a, 4)), t.call(|id| job(id, &b, 8)));
    match ra.unwrap() {
        WorkerResponse::StretchOk { output_planar, .. } => assert_eq!(output_planar, pack_planar(&a)),
        other => panic!("unexpected {other:?}"),
    }
    match rb.unwrap() {
        WorkerResponse::StretchOk {
            output_planar,
            channels,
            ..
        } => {
            assert_eq!(channels, 2);
            assert_eq!(output_planar, pack_planar(&b));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn per_request_errors_stay_local() {
    let t = StretchTransport::spawn(echo_handler).unwrap();
    let input = vec![vec![0.5f32; 4]];
    let bad = t.call(|id| job(id, &input, 0)).await.unwrap();
    assert!(matches!(bad, WorkerResponse::StretchError { .. }));
    let good = t.call(|id| job(id, &input, 4)).await.unwrap();
    assert!(matches!(good, WorkerResponse::StretchOk { .. }));
    assert!(!t.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_crash_rejects_everything_in_flight() {
    let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
    let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
    let t = Arc::new(
        StretchTransport::spawn(move |_req| {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            panic!("codec crashed");
        })
        .unwrap(),
    );

    let input = vec![vec![0.0f32; 4]];
    let first = tokio::spawn({
        let t = Arc::clone(&t);
        let input = input.clone();
        async move { t.call(|id| job(id, &input, 4)).await }
    });
    started_rx.recv().unwrap();
    let second = tokio::spawn({
        let t = Arc::clone(&t);
        async move { t.call(|id| job(id, &input, 4)).await }
    });
    // Let the second request reach the queue before the crash.
    tokio::task::yield_now().await;
    gate_tx.send(()).unwrap();

    assert!(first.await.unwrap().unwrap_err().is_transport());
    assert!(second.await.unwrap().unwrap_err().is_transport());

    let later = t.call(|id| WorkerRequest::Init { request_id: id }).await;
    assert!(later.unwrap_err().is_transport());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_rejects_pending_and_new_requests() {
    let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
    let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();
    let t = Arc::new(
        StretchTransport::spawn(move |req| {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            echo_handler(req)
        })
        .unwrap(),
    );

    let pending = tokio::spawn({
        let t = Arc::clone(&t);
        async move { t.call(|id| WorkerRequest::Init { request_id: id }).await }
    });
    started_rx.recv().unwrap();

    // The worker is still inside the handler; shutdown must not wait for it.
    t.shutdown();
    let err = pending.await.unwrap().unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("destroyed"));

    gate_tx.send(()).unwrap();
    assert!(t.is_closed());
    let after = t.call(|id| WorkerRequest::Init { request_id: id }).await;
    assert!(after.unwrap_err().is_transport());
}
