//! Tests for cooperative cancellation.

mod common;

use common::*;
use fetchnet::base::error::FetchError;
use fetchnet::client::Client;
use fetchnet::fetch::abort::AbortController;
use fetchnet::transport::Frame;
use std::time::Duration;

#[tokio::test]
async fn test_abort_after_bind_yields_failure() {
    let transport = ScriptedTransport::new();
    transport.route("https://example.com/pending", Vec::new());

    let client = client_over(transport.clone());
    let controller = AbortController::new();
    let promise = client
        .get("https://example.com/pending")
        .controller(&controller)
        .send();

    transport.dispatched(1).await;
    controller.abort();

    // The transport surfaces the cancel as an error frame; with the
    // controller aborted it resolves as Aborted, never a Response.
    match promise.wait().await {
        Err(FetchError::Aborted) => {}
        other => panic!("expected Aborted, got {other:?}"),
    }
    assert_eq!(transport.cancelled().len(), 1);
}

#[tokio::test]
async fn test_abort_is_idempotent_through_the_transport() {
    let transport = ScriptedTransport::new();
    transport.route("https://example.com/pending", Vec::new());

    let client = client_over(transport.clone());
    let controller = AbortController::new();
    let promise = client
        .get("https://example.com/pending")
        .controller(&controller)
        .send();

    transport.dispatched(1).await;
    controller.abort();
    controller.abort();
    controller.abort();

    assert!(controller.is_aborted());
    assert_eq!(transport.cancelled().len(), 1);
    assert!(matches!(promise.wait().await, Err(FetchError::Aborted)));
}

#[tokio::test]
async fn test_abort_before_dispatch_is_lost() {
    let transport = ScriptedTransport::new();
    transport.route(
        "https://example.com/unaffected",
        frames(vec![response_frame(200, payload(64))]),
    );

    let client = client_over(transport.clone());
    let controller = AbortController::new();
    controller.abort();

    // Late binding: the early abort forwarded nothing, so the request
    // proceeds and resolves normally.
    let response = client
        .get("https://example.com/unaffected")
        .controller(&controller)
        .send()
        .wait()
        .await
        .unwrap();

    assert_eq!(response.body().unwrap().len(), 64);
    assert!(transport.cancelled().is_empty());
}

#[tokio::test]
async fn test_abort_tears_down_stream_coordinator() {
    let transport = ScriptedTransport::without_cancel_errors();
    transport.route(
        "https://example.com/live",
        frames(vec![
            open_frame(200, None),
            Frame::Chunk(payload(512)),
            // Stream stays open.
        ]),
    );

    let client = client_over(transport.clone());
    let controller = AbortController::new();
    let mut response = client
        .get("https://example.com/live")
        .controller(&controller)
        .send()
        .wait()
        .await
        .unwrap();
    assert!(response.is_streaming());

    let stream = response.take_stream().unwrap();
    let drain = tokio::spawn(stream.drain());

    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.abort();

    // The coordinator terminates with an abort error instead of lingering
    // until its inactivity window.
    assert_eq!(drain.await.unwrap(), Err(FetchError::Aborted));
    assert_eq!(transport.cancelled().len(), 1);
}

#[tokio::test]
async fn test_abort_already_aborted_before_stream_spawn() {
    let transport = ScriptedTransport::without_cancel_errors();
    transport.route(
        "https://example.com/late",
        vec![
            ScriptStep::Frame(open_frame(200, None)),
            ScriptStep::Delay(Duration::from_millis(40)),
            ScriptStep::Frame(Frame::Chunk(payload(8))),
        ],
    );

    let client = client_over(transport.clone());
    let controller = AbortController::new();
    let promise = client
        .get("https://example.com/late")
        .controller(&controller)
        .send();

    // Abort lands after bind but around coordinator spawn; attachment
    // tears the stream down either way.
    transport.dispatched(1).await;
    controller.abort();

    match promise.wait().await {
        Ok(mut response) => {
            let result = response.take_stream().unwrap().drain().await;
            assert_eq!(result, Err(FetchError::Aborted));
        }
        Err(reason) => assert_eq!(reason, FetchError::Aborted),
    }
}

#[tokio::test]
async fn test_one_controller_binds_once_across_requests() {
    let transport = ScriptedTransport::new();
    transport.route("https://example.com/first", Vec::new());
    transport.route("https://example.com/second", Vec::new());

    let client = Client::builder(transport.clone())
        .config(quick_config())
        .build();
    let controller = AbortController::new();

    let first = client
        .get("https://example.com/first")
        .controller(&controller)
        .send();
    let second = client
        .get("https://example.com/second")
        .controller(&controller)
        .send();

    transport.dispatched(2).await;
    controller.abort();

    // Only the first-bound request is cancelled at the transport.
    assert_eq!(transport.cancelled().len(), 1);
    let _ = first.wait().await;
    let _ = second.wait().await;
}

#[tokio::test]
async fn test_controller_tokens_are_unique() {
    assert_ne!(
        AbortController::new().token(),
        AbortController::new().token()
    );
}
