//! Stream coordination and the consumer drain protocol.
//!
//! A [`StreamCoordinator`] is spawned per streaming response. It owns the
//! request's delivery channel from the point the executor classifies the
//! response, and relays transport frames to the consumer as a small fixed
//! protocol: chunk, end, or error. It never buffers payload data itself;
//! frames cross one-for-one in arrival order with only a running byte
//! counter on the side.

use crate::base::config::FetchConfig;
use crate::base::error::{FetchError, TimeoutDomain};
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::transport::{CorrelationId, Delivery, Frame};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Commands a consumer (or an aborting controller) sends to the
/// coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamCmd {
    /// Start relaying.
    Pull,
    /// Tear the stream down.
    Cancel,
}

/// Messages relayed to the consumer.
#[derive(Debug, Clone)]
pub(crate) enum StreamMsg {
    Chunk(Bytes),
    End,
    Error(FetchError),
}

/// Consumer-side handle to a live stream coordinator.
///
/// Drain it in one call with [`BodyStream::drain`], or consume it
/// incrementally through its `futures::Stream` implementation. Either way
/// the first read sends the coordinator its pull.
pub struct BodyStream {
    cmds: mpsc::UnboundedSender<StreamCmd>,
    msgs: mpsc::UnboundedReceiver<StreamMsg>,
    drain_timeout: Duration,
    pulled: bool,
    done: bool,
}

impl BodyStream {
    /// Pull the stream to completion and return the materialized body.
    ///
    /// `Ok` only on a clean end of stream. Relayed stream errors and a
    /// quiet drain window surface as `Err` rather than as silently
    /// partial bytes.
    pub async fn drain(mut self) -> Result<Bytes, FetchError> {
        self.pull();
        let mut collected = BytesMut::new();
        loop {
            match tokio::time::timeout(self.drain_timeout, self.msgs.recv()).await {
                Ok(Some(StreamMsg::Chunk(chunk))) => collected.extend_from_slice(&chunk),
                Ok(Some(StreamMsg::End)) => return Ok(collected.freeze()),
                Ok(Some(StreamMsg::Error(reason))) => return Err(reason),
                Ok(None) => {
                    return Err(FetchError::Protocol(
                        "stream coordinator went away without a terminal message".to_string(),
                    ))
                }
                Err(_) => {
                    return Err(FetchError::Timeout {
                        domain: TimeoutDomain::Drain,
                        after: self.drain_timeout,
                    })
                }
            }
        }
    }

    fn pull(&mut self) {
        if !self.pulled {
            self.pulled = true;
            let _ = self.cmds.send(StreamCmd::Pull);
        }
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, FetchError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        this.pull();
        match this.msgs.poll_recv(cx) {
            Poll::Ready(Some(StreamMsg::Chunk(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(StreamMsg::End)) | Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(StreamMsg::Error(reason))) => {
                this.done = true;
                Poll::Ready(Some(Err(reason)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream")
            .field("pulled", &self.pulled)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Background relay between transport frames and one consumer.
///
/// State machine: awaiting the consumer's pull, then relaying, then
/// terminal. Terminal always leaves the consumer with an end or error
/// message; the task never outlives the stream plus its inactivity
/// window.
pub(crate) struct StreamCoordinator {
    id: CorrelationId,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    /// A frame the executor already received on the consumer's behalf,
    /// replayed first (a complete body crossing as a stream).
    pending: Option<Frame>,
    consumer: mpsc::UnboundedSender<StreamMsg>,
    cmds: mpsc::UnboundedReceiver<StreamCmd>,
    telemetry: Arc<dyn Telemetry>,
    declared_length: u64,
    inactivity: Duration,
    total_bytes: u64,
    started: Instant,
}

impl StreamCoordinator {
    /// Spawn the relay task. Returns the consumer handle and the cancel
    /// sender used for abort wiring.
    pub(crate) fn spawn(
        id: CorrelationId,
        deliveries: mpsc::UnboundedReceiver<Delivery>,
        pending: Option<Frame>,
        declared_length: u64,
        telemetry: Arc<dyn Telemetry>,
        config: &FetchConfig,
    ) -> (BodyStream, mpsc::UnboundedSender<StreamCmd>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            id,
            deliveries,
            pending,
            consumer: msg_tx,
            cmds: cmd_rx,
            telemetry,
            declared_length,
            inactivity: config.stream_inactivity_timeout,
            total_bytes: 0,
            started: Instant::now(),
        };
        tokio::spawn(coordinator.run());
        let handle = BodyStream {
            cmds: cmd_tx.clone(),
            msgs: msg_rx,
            drain_timeout: config.drain_timeout,
            pulled: false,
            done: false,
        };
        (handle, cmd_tx)
    }

    async fn run(mut self) {
        if !self.await_pull().await {
            return;
        }

        self.started = Instant::now();
        self.telemetry.emit(&TelemetryEvent::StreamingStart {
            content_length: self.declared_length,
        });
        tracing::debug!(id = %self.id, declared = self.declared_length, "stream relay started");

        if let Some(frame) = self.pending.take() {
            if self.relay(frame) {
                return;
            }
        }

        let mut deadline = Instant::now() + self.inactivity;
        loop {
            tokio::select! {
                cmd = self.cmds.recv() => match cmd {
                    Some(StreamCmd::Pull) => {} // redundant pulls are harmless
                    Some(StreamCmd::Cancel) | None => {
                        self.cut_off(FetchError::Aborted);
                        return;
                    }
                },
                delivery = self.deliveries.recv() => match delivery {
                    Some(delivery) if delivery.id == self.id => {
                        deadline = Instant::now() + self.inactivity;
                        if self.relay(delivery.frame) {
                            return;
                        }
                    }
                    Some(delivery) => {
                        self.fail(FetchError::Protocol(format!(
                            "delivery for {} on stream {}",
                            delivery.id, self.id
                        )));
                        return;
                    }
                    None => {
                        self.fail(FetchError::Transport(
                            "delivery channel closed mid-stream".to_string(),
                        ));
                        return;
                    }
                },
                _ = sleep_until(deadline) => {
                    tracing::debug!(id = %self.id, total_bytes = self.total_bytes, "stream went quiet, cutting off");
                    self.cut_off(FetchError::Timeout {
                        domain: TimeoutDomain::Stream,
                        after: self.inactivity,
                    });
                    return;
                }
            }
        }
    }

    /// Wait for the consumer's pull before relaying anything. The
    /// inactivity window bounds this state too, so an abandoned stream
    /// still terminates.
    async fn await_pull(&mut self) -> bool {
        let deadline = Instant::now() + self.inactivity;
        loop {
            tokio::select! {
                cmd = self.cmds.recv() => match cmd {
                    Some(StreamCmd::Pull) => return true,
                    Some(StreamCmd::Cancel) | None => {
                        self.cut_off(FetchError::Aborted);
                        return false;
                    }
                },
                _ = sleep_until(deadline) => {
                    self.cut_off(FetchError::Timeout {
                        domain: TimeoutDomain::Stream,
                        after: self.inactivity,
                    });
                    return false;
                }
            }
        }
    }

    /// Relay one frame. Returns true when the frame was terminal.
    fn relay(&mut self, frame: Frame) -> bool {
        match frame {
            Frame::Chunk(chunk) => {
                self.forward_chunk(chunk);
                false
            }
            Frame::Body(body) => {
                // A complete body in one frame: counts as its only chunk.
                self.forward_chunk(body);
                self.finish();
                true
            }
            Frame::End => {
                self.finish();
                true
            }
            Frame::Error(reason) => {
                let _ = self.consumer.send(StreamMsg::Error(FetchError::Transport(reason)));
                true
            }
            Frame::Header(..) => false, // trailing headers reset the clock, nothing to relay
            Frame::Response { .. } | Frame::Open { .. } => {
                self.fail(FetchError::Protocol(format!(
                    "unexpected {} frame on an open stream",
                    frame.kind()
                )));
                true
            }
        }
    }

    fn forward_chunk(&mut self, chunk: Bytes) {
        self.total_bytes += chunk.len() as u64;
        self.telemetry.emit(&TelemetryEvent::StreamingChunk {
            bytes_received: chunk.len() as u64,
            total_bytes: self.total_bytes,
        });
        let _ = self.consumer.send(StreamMsg::Chunk(chunk));
    }

    fn finish(&mut self) {
        self.telemetry.emit(&TelemetryEvent::StreamingStop {
            total_bytes: self.total_bytes,
            duration: self.started.elapsed(),
        });
        tracing::debug!(id = %self.id, total_bytes = self.total_bytes, "stream relay finished");
        let _ = self.consumer.send(StreamMsg::End);
    }

    /// Unilateral termination (inactivity or abort): stop telemetry with
    /// the bytes collected so far, then an error for the consumer.
    fn cut_off(&mut self, reason: FetchError) {
        self.telemetry.emit(&TelemetryEvent::StreamingStop {
            total_bytes: self.total_bytes,
            duration: self.started.elapsed(),
        });
        let _ = self.consumer.send(StreamMsg::Error(reason));
    }

    /// Terminal failure relayed from the transport side.
    fn fail(&mut self, reason: FetchError) {
        let _ = self.consumer.send(StreamMsg::Error(reason));
    }
}

/// Build a detached consumer handle for unit tests, with the coordinator
/// side of both channels exposed.
#[cfg(test)]
pub(crate) fn stub_stream() -> (
    BodyStream,
    mpsc::UnboundedSender<StreamMsg>,
    mpsc::UnboundedReceiver<StreamCmd>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let handle = BodyStream {
        cmds: cmd_tx,
        msgs: msg_rx,
        drain_timeout: Duration::from_secs(60),
        pulled: false,
        done: false,
    };
    (handle, msg_tx, cmd_rx)
}
