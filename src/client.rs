//! HTTP client with builder pattern.
//!
//! Assembles the pipeline: a transport, a telemetry sink, and a
//! [`FetchConfig`], plus a high-level, ergonomic request API.
//!
//! # Example
//!
//! ```rust,ignore
//! use fetchnet::client::Client;
//!
//! let client = Client::builder(transport)
//!     .request_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let response = client.get("https://example.com")
//!     .send()
//!     .wait()
//!     .await?;
//! ```

use crate::base::config::FetchConfig;
use crate::base::error::FetchError;
use crate::fetch::abort::AbortController;
use crate::fetch::executor;
use crate::fetch::promise::Promise;
use crate::http::request::{ClientOptions, Request, RequestOptions};
use crate::http::response::Response;
use crate::telemetry::{Telemetry, TracingTelemetry};
use crate::transport::Transport;
use http::{HeaderMap, Method};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP client for making requests.
///
/// Cheap to clone; clones share the transport and telemetry sink.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    telemetry: Arc<dyn Telemetry>,
    config: FetchConfig,
}

impl Client {
    /// Create a client over `transport` with default settings.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    /// Create a new client builder over `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder {
            transport,
            telemetry: None,
            config: FetchConfig::default(),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a PATCH request.
    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start building a request with an explicit method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            content_type: None,
            request_options: RequestOptions::default(),
            client_options: ClientOptions::default(),
            controller: None,
        }
    }

    /// Dispatch a request. The promise is returned immediately; the
    /// request runs as its own unit of work.
    pub fn fetch(&self, request: Request) -> Promise<Response> {
        self.fetch_with(request, None)
    }

    /// Dispatch a request with an abort controller bound once the
    /// transport accepts it.
    pub fn fetch_with(
        &self,
        request: Request,
        controller: Option<&AbortController>,
    ) -> Promise<Response> {
        Promise::spawn(executor::run(
            self.transport.clone(),
            self.telemetry.clone(),
            self.config.clone(),
            request,
            controller.cloned(),
        ))
    }
}

/// Builder for creating a [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    telemetry: Option<Arc<dyn Telemetry>>,
    config: FetchConfig,
}

impl ClientBuilder {
    /// Set the telemetry sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Replace the whole pipeline configuration.
    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request timeout budget.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the streaming threshold in bytes.
    pub fn streaming_threshold(mut self, threshold: u64) -> Self {
        self.config.streaming_threshold = threshold;
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        Client {
            transport: self.transport,
            telemetry: self
                .telemetry
                .unwrap_or_else(|| Arc::new(TracingTelemetry)),
            config: self.config,
        }
    }
}

/// Builder for a single request.
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<bytes::Bytes>,
    content_type: Option<String>,
    request_options: RequestOptions,
    client_options: ClientOptions,
    controller: Option<AbortController>,
}

impl RequestBuilder {
    /// Add a header.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: http::header::IntoHeaderName,
        V: TryInto<http::HeaderValue>,
    {
        if let Ok(val) = value.try_into() {
            self.headers.insert(key, val);
        }
        self
    }

    /// Set the request body.
    pub fn body<B: Into<bytes::Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the content type.
    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set a JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(mut self, json: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(json) {
            self.body = Some(bytes.into());
            self.content_type = Some("application/json".to_string());
        }
        self
    }

    /// Set transport options scoped to this request.
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Set transport options scoped to the issuing client.
    pub fn client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }

    /// Attach an abort controller to the request.
    pub fn controller(mut self, controller: &AbortController) -> Self {
        self.controller = Some(controller.clone());
        self
    }

    /// Dispatch the request.
    ///
    /// Always returns a promise immediately; a malformed target settles
    /// it with a failure rather than raising.
    pub fn send(self) -> Promise<Response> {
        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(e) => {
                return Promise::settled(Err(FetchError::InvalidUrl(format!(
                    "{}: {e}",
                    self.url
                ))))
            }
        };

        let mut request = Request::new(self.method, url)
            .with_headers(self.headers)
            .with_request_options(self.request_options)
            .with_client_options(self.client_options);
        if let Some(body) = self.body {
            request = request.with_body(body);
        }
        if let Some(content_type) = self.content_type {
            request = request.with_content_type(content_type);
        }

        self.client.fetch_with(request, self.controller.as_ref())
    }
}
