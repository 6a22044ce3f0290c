//! # fetchnet
//!
//! A browser-inspired HTTP request orchestration library for Rust.
//!
//! `fetchnet` layers a promise-oriented request pipeline over a pluggable
//! HTTP transport. Requests resolve through awaitable, chainable promises;
//! large or length-unknown responses are relayed chunk by chunk through a
//! background stream coordinator; in-flight requests can be cancelled
//! cooperatively through shared abort controllers.
//!
//! ## Features
//!
//! - **Promise pipeline**: every request returns a [`fetch::Promise`]
//!   immediately; await it with an optional deadline or chain it with
//!   `then`-style continuations, including dependent follow-up requests
//! - **Automatic streaming**: responses above the streaming threshold
//!   (5,000,000 declared bytes) or with no declared length arrive as a
//!   live [`fetch::BodyStream`] instead of a buffered body
//! - **Cooperative cancellation**: an [`fetch::AbortController`] bound to
//!   an in-flight request forwards cancellation to the transport and tears
//!   down any live stream coordinator
//! - **Telemetry**: request and streaming lifecycle events emitted to a
//!   pluggable, fire-and-forget [`telemetry::Telemetry`] sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fetchnet::client::Client;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new(Arc::new(transport));
//!     let response = client.get("https://example.com/data").send().wait().await.unwrap();
//!     println!("Status: {}", response.status());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Configuration and error definitions
//! - [`transport`] - The consumed transport delivery contract
//! - [`telemetry`] - The produced telemetry event contract
//! - [`http`] - Request and response types
//! - [`fetch`] - Request executor, stream coordinator, promises, and
//!   abort controllers
//! - [`client`] - High-level client and request builder

pub mod base;
pub mod client;
pub mod fetch;
pub mod http;
pub mod telemetry;
pub mod transport;
