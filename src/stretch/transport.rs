use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context as _;
use tokio::sync::oneshot;

use crate::foundation::error::{VeirError, VeirResult};
use crate::stretch::segment::SegmentTuning;

/// Caller-generated correlation id of one request.
pub(crate) type RequestId = u64;

/// One stretch job as sent to the background context. Audio is packed channel-major.
#[derive(Clone, Debug)]
pub(crate) struct StretchJob {
    pub(crate) request_id: RequestId,
    pub(crate) sample_rate: u32,
    pub(crate) channels: u16,
    pub(crate) input_planar: Vec<f32>,
    pub(crate) input_frames: usize,
    pub(crate) output_frames: usize,
    pub(crate) ratio_curve: Vec<f64>,
    pub(crate) tuning: SegmentTuning,
}

#[derive(Debug)]
pub(crate) enum WorkerRequest {
    Init {
        request_id: RequestId,
    },
    Stretch(StretchJob),
}

#[derive(Debug)]
pub(crate) enum WorkerResponse {
    InitOk {
        request_id: RequestId,
    },
    InitError {
        request_id: RequestId,
        message: String,
    },
    StretchOk {
        request_id: RequestId,
        output_planar: Vec<f32>,
        output_frames: usize,
        channels: u16,
    },
    StretchError {
        request_id: RequestId,
        message: String,
    },
}

impl WorkerResponse {
    pub(crate) fn request_id(&self) -> RequestId {
        match self {
            Self::InitOk { request_id }
            | Self::InitError { request_id, .. }
            | Self::StretchOk { request_id, .. }
            | Self::StretchError { request_id, .. } => *request_id,
        }
    }
}

/// Concatenate planar channels into one channel-major buffer.
pub(crate) fn pack_planar(planar: &[Vec<f32>]) -> Vec<f32> {
    planar.concat()
}

/// Split a channel-major buffer back into `channels` buffers of `frames` samples.
pub(crate) fn unpack_planar(
    packed: &[f32],
    channels: usize,
    frames: usize,
) -> VeirResult<Vec<Vec<f32>>> {
    if packed.len() != channels * frames {
        return Err(VeirError::transport(format!(
            "packed buffer holds {} samples, expected {channels} x {frames}",
            packed.len()
        )));
    }
    if frames == 0 {
        return Ok(vec![Vec::new(); channels]);
    }
    Ok(packed.chunks_exact(frames).map(<[f32]>::to_vec).collect())
}

type Reply = oneshot::Sender<VeirResult<WorkerResponse>>;

#[derive(Default)]
struct Pending {
    closed: Option<String>,
    next_id: RequestId,
    waiting: HashMap<RequestId, Reply>,
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reject every waiting request and refuse new ones. The first reason sticks.
fn fail_all(pending: &Mutex<Pending>, reason: &str) {
    let mut p = lock(pending);
    let reason = p.closed.get_or_insert_with(|| reason.to_owned()).clone();
    let n = p.waiting.len();
    for (_, reply) in p.waiting.drain() {
        let _ = reply.send(Err(VeirError::transport(reason.clone())));
    }
    if n > 0 {
        tracing::warn!(rejected = n, %reason, "stretch transport closed with requests in flight");
    }
}

/// Request/response channel to one background stretch context.
///
/// A dedicated worker thread runs the handler one request at a time; a router thread matches
/// responses to waiting callers by request id. When the worker goes away (shutdown or panic)
/// every request still waiting is rejected with [`VeirError::Transport`].
///
/// Both threads are detached. After shutdown the worker finishes the request it is running, sees
/// the closed request channel and exits; the router follows once the worker is gone.
pub(crate) struct StretchTransport {
    to_worker: Mutex<Option<mpsc::Sender<WorkerRequest>>>,
    pending: Arc<Mutex<Pending>>,
}

impl StretchTransport {
    /// Start the background context. `handle` owns all codec state and never runs concurrently.
    pub(crate) fn spawn<H>(mut handle: H) -> VeirResult<Self>
    where
        H: FnMut(WorkerRequest) -> WorkerResponse + Send + 'static,
    {
        let (to_worker, requests) = mpsc::channel::<WorkerRequest>();
        let (to_router, responses) = mpsc::channel::<WorkerResponse>();
        let pending = Arc::new(Mutex::new(Pending::default()));

        std::thread::Builder::new()
            .name("veir-stretch-worker".into())
            .spawn(move || {
                while let Ok(req) = requests.recv() {
                    if to_router.send(handle(req)).is_err() {
                        break;
                    }
                }
                tracing::debug!("stretch worker exiting");
            })
            .context("failed to spawn stretch worker thread")?;

        let router_pending = Arc::clone(&pending);
        std::thread::Builder::new()
            .name("veir-stretch-router".into())
            .spawn(move || {
                for resp in responses {
                    let id = resp.request_id();
                    let reply = lock(&router_pending).waiting.remove(&id);
                    match reply {
                        Some(reply) => {
                            let _ = reply.send(Ok(resp));
                        }
                        None => tracing::debug!(id, "dropping response nobody is waiting for"),
                    }
                }
                fail_all(&router_pending, "stretch context terminated");
            })
            .context("failed to spawn stretch router thread")?;

        Ok(Self {
            to_worker: Mutex::new(Some(to_worker)),
            pending,
        })
    }

    /// Send one request and wait for its response.
    pub(crate) async fn call(
        &self,
        make: impl FnOnce(RequestId) -> WorkerRequest,
    ) -> VeirResult<WorkerResponse> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut p = lock(&self.pending);
            if let Some(reason) = &p.closed {
                return Err(VeirError::transport(reason.clone()));
            }
            p.next_id += 1;
            let id = p.next_id;
            p.waiting.insert(id, tx);
            id
        };
        let sent = match &*self.to_worker.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(to_worker) => to_worker.send(make(id)).is_ok(),
            None => false,
        };
        if !sent {
            fail_all(&self.pending, "stretch context is not running");
        }
        rx.await
            .unwrap_or_else(|_| Err(VeirError::transport("stretch context dropped the request")))
    }

    /// Reject everything in flight and close the request channel. Never blocks on the worker.
    ///
    /// Idempotent.
    pub(crate) fn shutdown(&self) {
        fail_all(&self.pending, "stretch engine destroyed");
        drop(
            self.to_worker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
    }

    /// `true` once the transport refuses new requests.
    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.pending).closed.is_some()
    }
}

impl Drop for StretchTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stretch/transport.rs"]
mod tests;
