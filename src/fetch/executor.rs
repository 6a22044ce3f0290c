//! Per-request execution.
//!
//! One executor runs per dispatched request, as its own spawned unit of
//! work. It drives the request from dispatch to a classified
//! [`Response`]: buffered when the declared length is known and within
//! the streaming threshold, streaming otherwise. Every failure converts
//! into a [`FetchError`] here; nothing unwinds past this boundary.

use crate::base::config::FetchConfig;
use crate::base::error::{FetchError, TimeoutDomain};
use crate::fetch::abort::AbortController;
use crate::fetch::coordinator::StreamCoordinator;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::transport::{
    declared_content_length, parse_response_parts, CorrelationId, Delivery, Frame, Transport,
};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

/// Drive one request to a response or a failure, bracketed by request
/// telemetry with duration measured start to finish.
pub(crate) async fn run(
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn Telemetry>,
    config: FetchConfig,
    request: Request,
    controller: Option<AbortController>,
) -> Result<Response, FetchError> {
    let url = request.url().to_string();
    telemetry.emit(&TelemetryEvent::RequestStart {
        method: request.method().clone(),
        url: url.clone(),
        headers: request.headers().clone(),
    });
    let started = Instant::now();

    let outcome = execute(
        transport,
        telemetry.clone(),
        &config,
        request,
        controller.as_ref(),
    )
    .await;

    let duration = started.elapsed();
    match &outcome {
        Ok(response) => {
            telemetry.emit(&TelemetryEvent::RequestStop {
                duration,
                status: response.status(),
                response_size: response.known_size(),
                url,
            });
        }
        Err(error) => {
            tracing::debug!(%url, error = %error, "request failed");
            telemetry.emit(&TelemetryEvent::RequestException {
                duration,
                url,
                error: error.to_string(),
            });
        }
    }
    outcome
}

async fn execute(
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn Telemetry>,
    config: &FetchConfig,
    request: Request,
    controller: Option<&AbortController>,
) -> Result<Response, FetchError> {
    let outcome = open_and_classify(transport, telemetry, config, request, controller).await;
    match outcome {
        // A transport failure on an aborted request is the abort showing
        // through; surface it as such instead of a generic failure.
        Err(FetchError::Transport(reason))
            if controller.is_some_and(AbortController::is_aborted) =>
        {
            tracing::debug!(%reason, "transport failure attributed to abort");
            Err(FetchError::Aborted)
        }
        other => other,
    }
}

async fn open_and_classify(
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn Telemetry>,
    config: &FetchConfig,
    request: Request,
    controller: Option<&AbortController>,
) -> Result<Response, FetchError> {
    let (reply_tx, mut deliveries) = mpsc::unbounded_channel();
    let id = transport.dispatch(&request, reply_tx)?;
    // Late binding: an abort requested before this point was lost.
    if let Some(controller) = controller {
        controller.bind(id, transport.clone());
    }
    tracing::debug!(id = %id, method = %request.method(), url = %request.url(), "request dispatched");

    let deadline = Instant::now() + config.request_timeout;
    let opening = recv_correlated(&mut deliveries, id, deadline, config.request_timeout).await?;

    match opening {
        Frame::Response {
            status,
            headers,
            body,
        } => {
            let (status, headers) = parse_response_parts(status, &headers)?;
            let length = declared_content_length(&headers).unwrap_or(body.len() as u64);
            if length <= config.streaming_threshold {
                Ok(Response::buffered(status, headers, body))
            } else {
                // An oversized pre-buffered delivery still crosses to the
                // consumer as a stream; the coordinator replays the body.
                let (stream, cancel) = StreamCoordinator::spawn(
                    id,
                    deliveries,
                    Some(Frame::Body(body)),
                    length,
                    telemetry,
                    config,
                );
                if let Some(controller) = controller {
                    controller.attach_stream(cancel);
                }
                Ok(Response::streaming(status, headers, stream))
            }
        }
        Frame::Open { status, headers } => {
            let (status, headers) = parse_response_parts(status, &headers)?;
            match declared_content_length(&headers) {
                Some(length) if length <= config.streaming_threshold => {
                    let body =
                        collect_inline(&mut deliveries, id, deadline, config.request_timeout)
                            .await?;
                    Ok(Response::buffered(status, headers, body))
                }
                declared => {
                    let (stream, cancel) = StreamCoordinator::spawn(
                        id,
                        deliveries,
                        None,
                        declared.unwrap_or(0),
                        telemetry,
                        config,
                    );
                    if let Some(controller) = controller {
                        controller.attach_stream(cancel);
                    }
                    Ok(Response::streaming(status, headers, stream))
                }
            }
        }
        Frame::Error(reason) => Err(FetchError::Transport(reason)),
        other => Err(FetchError::Protocol(format!(
            "unexpected {} frame while waiting for a response",
            other.kind()
        ))),
    }
}

/// Receive the next delivery for `id` before `deadline`.
async fn recv_correlated(
    deliveries: &mut mpsc::UnboundedReceiver<Delivery>,
    id: CorrelationId,
    deadline: Instant,
    budget: Duration,
) -> Result<Frame, FetchError> {
    match timeout_at(deadline, deliveries.recv()).await {
        Ok(Some(delivery)) if delivery.id == id => Ok(delivery.frame),
        Ok(Some(delivery)) => Err(FetchError::Protocol(format!(
            "delivery for {} while waiting on {}",
            delivery.id, id
        ))),
        Ok(None) => Err(FetchError::Transport(
            "delivery channel closed before a response arrived".to_string(),
        )),
        Err(_) => Err(FetchError::Timeout {
            domain: TimeoutDomain::Request,
            after: budget,
        }),
    }
}

/// Materialize a small declared-length body inline, without spawning a
/// coordinator. Shares the request deadline with the opening delivery.
async fn collect_inline(
    deliveries: &mut mpsc::UnboundedReceiver<Delivery>,
    id: CorrelationId,
    deadline: Instant,
    budget: Duration,
) -> Result<Bytes, FetchError> {
    let mut collected = BytesMut::new();
    loop {
        match recv_correlated(deliveries, id, deadline, budget).await? {
            Frame::Chunk(chunk) => collected.extend_from_slice(&chunk),
            Frame::Body(body) => {
                collected.extend_from_slice(&body);
                return Ok(collected.freeze());
            }
            Frame::End => return Ok(collected.freeze()),
            Frame::Header(..) => {}
            Frame::Error(reason) => return Err(FetchError::Transport(reason)),
            other => {
                return Err(FetchError::Protocol(format!(
                    "unexpected {} frame in a buffered body",
                    other.kind()
                )))
            }
        }
    }
}
