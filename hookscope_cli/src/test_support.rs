//! Fixtures shared by the unit tests

use crate::live::snapshot::{SnapshotLoader, SnapshotSource, SnapshotTicket};
use crate::live::transport::{FrameStream, PushTransport};
use crate::live::LiveError;
use chrono::{TimeZone, Utc};
use hookscope_common::{
    CapturedRequest, EndpointId, LiveFrame, LiveRequest, RequestId, RequestsPage,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Serve `app` on an ephemeral port, returning its base URL
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

pub fn sample_request(id: RequestId, endpoint_id: EndpointId) -> CapturedRequest {
    CapturedRequest {
        id,
        endpoint_id,
        method: "POST".to_string(),
        headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
        body: format!("{{\"n\":{}}}", id),
        query_params: String::new(),
        source_ip: "127.0.0.1".to_string(),
        content_type: "application/json".to_string(),
        received_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        endpoint: None,
    }
}

pub fn page(requests: Vec<CapturedRequest>) -> RequestsPage {
    RequestsPage {
        total: requests.len() as u64,
        limit: 50,
        offset: 0,
        requests,
    }
}

/// JSON text of a `new_request` frame
pub fn new_request_frame(id: RequestId, endpoint_id: EndpointId) -> String {
    let payload = LiveRequest {
        request: sample_request(id, endpoint_id),
        endpoint_slug: format!("ep{}", endpoint_id),
        endpoint_name: format!("Endpoint {}", endpoint_id),
    };
    LiveFrame::new_request(&payload).unwrap().to_json().unwrap()
}

/// Loader that only records what was asked of it
#[derive(Clone, Default)]
pub struct RecordingLoader {
    tickets: Arc<Mutex<Vec<SnapshotTicket>>>,
}

impl RecordingLoader {
    pub fn tickets(&self) -> Vec<SnapshotTicket> {
        self.tickets.lock().unwrap().clone()
    }

    pub fn last(&self) -> SnapshotTicket {
        *self.tickets.lock().unwrap().last().expect("no snapshot requested")
    }
}

impl SnapshotLoader for RecordingLoader {
    fn request_snapshot(&self, ticket: SnapshotTicket) {
        self.tickets.lock().unwrap().push(ticket);
    }
}

type Outcome = Result<Vec<RequestId>, String>;

/// Snapshot source whose fetches block until the test releases them
#[derive(Clone, Default)]
pub struct GatedSource {
    gates: Arc<Mutex<HashMap<EndpointId, Arc<watch::Sender<Option<Outcome>>>>>>,
}

impl GatedSource {
    fn gate(&self, endpoint: EndpointId) -> Arc<watch::Sender<Option<Outcome>>> {
        self.gates
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_insert_with(|| Arc::new(watch::channel(None).0))
            .clone()
    }

    pub fn release(&self, endpoint: EndpointId, ids: Vec<RequestId>) {
        self.gate(endpoint).send_replace(Some(Ok(ids)));
    }

    pub fn fail(&self, endpoint: EndpointId, error: &str) {
        self.gate(endpoint).send_replace(Some(Err(error.to_string())));
    }
}

impl SnapshotSource for GatedSource {
    fn fetch(
        &self,
        endpoint: EndpointId,
    ) -> impl Future<Output = anyhow::Result<RequestsPage>> + Send {
        let gate = self.gate(endpoint);
        let mut rx = gate.subscribe();
        async move {
            let outcome = rx.wait_for(Option::is_some).await.ok().and_then(|o| o.clone());
            drop(gate);
            match outcome {
                Some(Ok(ids)) => Ok(page(
                    ids.into_iter().map(|id| sample_request(id, endpoint)).collect(),
                )),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Err(anyhow::anyhow!("gate closed")),
            }
        }
    }
}

enum Step {
    Open(mpsc::UnboundedReceiver<Result<String, LiveError>>),
    Fail,
}

struct ScriptInner {
    attempts: AtomicUsize,
    steps: Mutex<VecDeque<Step>>,
}

/// Transport that plays back scripted connection attempts. Once the
/// script runs out, `connect` never completes.
pub struct ScriptedTransport {
    inner: Arc<ScriptInner>,
}

/// Test-side handle for a `ScriptedTransport`
pub struct Script {
    inner: Arc<ScriptInner>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, Script) {
        let inner = Arc::new(ScriptInner {
            attempts: AtomicUsize::new(0),
            steps: Mutex::new(VecDeque::new()),
        });
        (
            Self {
                inner: inner.clone(),
            },
            Script { inner },
        )
    }
}

impl Script {
    /// Next attempt succeeds; frames sent here are delivered on it and
    /// dropping the sender closes it
    pub fn open(&self) -> mpsc::UnboundedSender<Result<String, LiveError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.steps.lock().unwrap().push_back(Step::Open(rx));
        tx
    }

    /// Next attempt fails to connect
    pub fn fail(&self) {
        self.inner.steps.lock().unwrap().push_back(Step::Fail);
    }

    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }
}

impl PushTransport for ScriptedTransport {
    fn connect(&self) -> impl Future<Output = Result<FrameStream, LiveError>> + Send {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.inner.steps.lock().unwrap().pop_front();

        async move {
            match step {
                Some(Step::Open(rx)) => {
                    let frames = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|item| (item, rx))
                    });
                    Ok(Box::pin(frames) as FrameStream)
                }
                Some(Step::Fail) => Err(LiveError::Dropped("scripted failure".to_string())),
                None => std::future::pending().await,
            }
        }
    }
}
