//! Transport delivery contract.
//!
//! The orchestration layer never touches the wire itself. It hands a
//! [`Request`](crate::http::Request) to a [`Transport`] implementation and
//! consumes the correlated [`Delivery`] frames the transport pushes back
//! over a caller-supplied channel. Connection establishment, TLS, and
//! protocol framing all live behind this seam.

use crate::base::error::FetchError;
use crate::http::request::Request;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-assigned handle correlating asynchronous deliveries with the
/// request that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Errors raised by the transport at dispatch time, before any delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("malformed request target: {0}")]
    BadTarget(String),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/// The closed set of frames a transport delivers for one request.
///
/// A request resolves as either a single [`Frame::Response`] or an opening
/// [`Frame::Open`] followed by body frames and a terminal
/// [`Frame::End`]/[`Frame::Error`].
#[derive(Debug, Clone)]
pub enum Frame {
    /// A complete buffered response in a single delivery.
    Response {
        status: u16,
        headers: Vec<(String, String)>,
        body: Bytes,
    },
    /// Stream opening: status line and headers. Body frames follow.
    Open {
        status: u16,
        headers: Vec<(String, String)>,
    },
    /// A late or trailing header on an open stream.
    Header(String, String),
    /// One piece of body data on an open stream.
    Chunk(Bytes),
    /// The entire body in a single frame on an open stream.
    Body(Bytes),
    /// Clean end of an open stream.
    End,
    /// Terminal transport failure for this request.
    Error(String),
}

impl Frame {
    /// Short tag for log and error messages; payloads stay out of them.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Response { .. } => "response",
            Frame::Open { .. } => "open",
            Frame::Header(..) => "header",
            Frame::Chunk(_) => "chunk",
            Frame::Body(_) => "body",
            Frame::End => "end",
            Frame::Error(_) => "error",
        }
    }
}

/// A correlated frame pushed by the transport.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: CorrelationId,
    pub frame: Frame,
}

/// The consumed transport contract.
///
/// `dispatch` must return quickly: it hands back a correlation id and
/// delivers all further progress asynchronously through the `reply`
/// sender, tagged with that id. `cancel` is best-effort and
/// fire-and-forget; a transport is free to ignore it.
pub trait Transport: Send + Sync + 'static {
    fn dispatch(
        &self,
        request: &Request,
        reply: mpsc::UnboundedSender<Delivery>,
    ) -> Result<CorrelationId, TransportError>;

    fn cancel(&self, id: CorrelationId);
}

/// Parse raw wire status and header text into typed parts.
///
/// The single place raw transport shapes become `http` types; everything
/// downstream of the executor pattern-matches on typed values only.
pub fn parse_response_parts(
    status: u16,
    headers: &[(String, String)],
) -> Result<(StatusCode, HeaderMap), FetchError> {
    let status = StatusCode::from_u16(status)
        .map_err(|_| FetchError::Protocol(format!("invalid status code {status}")))?;
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::Protocol(format!("invalid header name {name:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::Protocol(format!("invalid value for header {name}")))?;
        map.append(name, value);
    }
    Ok((status, map))
}

/// Declared Content-Length, if present and well-formed.
pub fn declared_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
