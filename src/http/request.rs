//! Request descriptor.
//!
//! A [`Request`] is immutable once dispatched: fields are private and the
//! executor and transport only read from it.

use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;
use url::Url;

/// Transport-specific options scoped to a single request.
///
/// Carried opaquely through the pipeline; only the transport interprets
/// them.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub connect_timeout: Option<Duration>,
    pub max_redirects: Option<u32>,
    /// Free-form pass-through settings.
    pub extra: Vec<(String, String)>,
}

/// Transport-specific options scoped to the issuing client.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub pool: Option<String>,
    pub proxy: Option<String>,
    /// Free-form pass-through settings.
    pub extra: Vec<(String, String)>,
}

/// One HTTP request, ready for dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    content_type: Option<String>,
    request_options: RequestOptions,
    client_options: ClientOptions,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            content_type: None,
            request_options: RequestOptions::default(),
            client_options: ClientOptions::default(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    pub fn client_options(&self) -> &ClientOptions {
        &self.client_options
    }
}
