//! Shared test doubles: a scripted in-memory transport and a recording
//! telemetry sink.

#![allow(dead_code)]

use bytes::Bytes;
use fetchnet::base::config::FetchConfig;
use fetchnet::client::Client;
use fetchnet::http::request::Request;
use fetchnet::telemetry::{Telemetry, TelemetryEvent};
use fetchnet::transport::{CorrelationId, Delivery, Frame, Transport, TransportError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// One scripted step: deliver a frame (with the correct correlation id or
/// a foreign one), or sit quiet for a while.
#[derive(Clone)]
pub enum ScriptStep {
    Frame(Frame),
    /// Delivered under an unrelated correlation id.
    Foreign(Frame),
    Delay(Duration),
}

pub fn frames(list: Vec<Frame>) -> Vec<ScriptStep> {
    list.into_iter().map(ScriptStep::Frame).collect()
}

/// An opening frame declaring `content_length`, or no length header at
/// all when `None`.
pub fn open_frame(status: u16, content_length: Option<u64>) -> Frame {
    let mut headers = vec![("content-type".to_string(), "application/octet-stream".to_string())];
    if let Some(length) = content_length {
        headers.push(("content-length".to_string(), length.to_string()));
    }
    Frame::Open { status, headers }
}

/// A complete-response frame carrying `body` and declaring its length.
pub fn response_frame(status: u16, body: Bytes) -> Frame {
    Frame::Response {
        status,
        headers: vec![("content-length".to_string(), body.len().to_string())],
        body,
    }
}

pub fn payload(len: usize) -> Bytes {
    Bytes::from(vec![0x42u8; len])
}

/// In-memory transport playing pre-routed frame scripts keyed by URL.
/// Each route is consumed by exactly one dispatch; the delivery channel
/// stays open after the script ends, so a script without a terminal
/// frame hangs the request the way a stalled connection would.
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Vec<ScriptStep>>>,
    next_id: AtomicU64,
    active: Mutex<HashMap<CorrelationId, UnboundedSender<Delivery>>>,
    cancelled: Mutex<Vec<CorrelationId>>,
    /// When set, `cancel` delivers an error frame for the request, the
    /// way a real transport surfaces an aborted connection.
    error_on_cancel: bool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
            error_on_cancel: true,
        })
    }

    /// A transport whose `cancel` records the call but delivers nothing,
    /// for exercising coordinator-side teardown alone.
    pub fn without_cancel_errors() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
            error_on_cancel: false,
        })
    }

    pub fn route(&self, url: &str, steps: Vec<ScriptStep>) {
        self.routes.lock().unwrap().insert(url.to_string(), steps);
    }

    pub fn cancelled(&self) -> Vec<CorrelationId> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn active_ids(&self) -> Vec<CorrelationId> {
        self.active.lock().unwrap().keys().copied().collect()
    }

    /// Wait until at least `n` requests have been dispatched.
    pub async fn dispatched(&self, n: usize) {
        for _ in 0..200 {
            if self.active.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("transport never saw {n} dispatches");
    }
}

impl Transport for ScriptedTransport {
    fn dispatch(
        &self,
        request: &Request,
        reply: UnboundedSender<Delivery>,
    ) -> Result<CorrelationId, TransportError> {
        let url = request.url().to_string();
        let steps = self
            .routes
            .lock()
            .unwrap()
            .remove(&url)
            .ok_or_else(|| TransportError::Dispatch(format!("no route for {url}")))?;

        let id = CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.active.lock().unwrap().insert(id, reply.clone());

        tokio::spawn(async move {
            for step in steps {
                match step {
                    ScriptStep::Delay(pause) => tokio::time::sleep(pause).await,
                    ScriptStep::Frame(frame) => {
                        if reply.send(Delivery { id, frame }).is_err() {
                            return;
                        }
                    }
                    ScriptStep::Foreign(frame) => {
                        let foreign = CorrelationId(id.0 + 1_000);
                        if reply.send(Delivery { id: foreign, frame }).is_err() {
                            return;
                        }
                    }
                }
            }
            // Channel intentionally stays open via the `active` map.
        });

        Ok(id)
    }

    fn cancel(&self, id: CorrelationId) {
        self.cancelled.lock().unwrap().push(id);
        if self.error_on_cancel {
            if let Some(reply) = self.active.lock().unwrap().get(&id) {
                let _ = reply.send(Delivery {
                    id,
                    frame: Frame::Error("request cancelled by caller".to_string()),
                });
            }
        }
    }
}

/// Telemetry sink collecting every event for later assertions.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count<F: Fn(&TelemetryEvent) -> bool>(&self, pred: F) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Config with short budgets so timeout paths finish quickly in tests.
pub fn quick_config() -> FetchConfig {
    FetchConfig {
        request_timeout: Duration::from_millis(80),
        stream_inactivity_timeout: Duration::from_millis(80),
        drain_timeout: Duration::from_millis(80),
        streaming_threshold: 5_000_000,
    }
}

pub fn client_over(transport: Arc<ScriptedTransport>) -> Client {
    Client::new(transport)
}

pub fn recording_client(
    transport: Arc<ScriptedTransport>,
    telemetry: Arc<RecordingTelemetry>,
) -> Client {
    Client::builder(transport).telemetry(telemetry).build()
}
