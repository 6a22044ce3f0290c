//! Telemetry event contract.
//!
//! The pipeline emits lifecycle events to a pluggable sink: one
//! start/stop/exception pair bracketing each request, and
//! start/chunk/stop events for each relayed stream. Emission is
//! fire-and-forget and must not block; the executor and coordinator call
//! [`Telemetry::emit`] inline.

use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;

/// One lifecycle event with its measurements and metadata.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    RequestStart {
        method: Method,
        url: String,
        headers: HeaderMap,
    },
    RequestStop {
        duration: Duration,
        status: StatusCode,
        response_size: u64,
        url: String,
    },
    RequestException {
        duration: Duration,
        url: String,
        error: String,
    },
    /// A stream coordinator entered its relay loop. `content_length` is
    /// the declared length, zero when unknown.
    StreamingStart { content_length: u64 },
    StreamingChunk {
        bytes_received: u64,
        total_bytes: u64,
    },
    StreamingStop {
        total_bytes: u64,
        duration: Duration,
    },
}

/// A telemetry sink. `emit` must not block.
pub trait Telemetry: Send + Sync {
    fn emit(&self, event: &TelemetryEvent);
}

/// Default sink: structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::RequestStart { method, url, .. } => {
                tracing::debug!(%method, %url, "request start");
            }
            TelemetryEvent::RequestStop {
                duration,
                status,
                response_size,
                url,
            } => {
                tracing::debug!(
                    %url,
                    status = status.as_u16(),
                    response_size = *response_size,
                    ?duration,
                    "request stop"
                );
            }
            TelemetryEvent::RequestException {
                duration,
                url,
                error,
            } => {
                tracing::debug!(%url, %error, ?duration, "request exception");
            }
            TelemetryEvent::StreamingStart { content_length } => {
                tracing::debug!(content_length = *content_length, "streaming start");
            }
            TelemetryEvent::StreamingChunk {
                bytes_received,
                total_bytes,
            } => {
                tracing::trace!(
                    bytes_received = *bytes_received,
                    total_bytes = *total_bytes,
                    "streaming chunk"
                );
            }
            TelemetryEvent::StreamingStop {
                total_bytes,
                duration,
            } => {
                tracing::debug!(total_bytes = *total_bytes, ?duration, "streaming stop");
            }
        }
    }
}
