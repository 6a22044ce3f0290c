//! Response with exactly one body representation.
//!
//! A resolved [`Response`] carries either a materialized body or a live
//! stream handle, never both and never neither. The constructors are the
//! only way in, so the invariant holds by construction.

use crate::base::error::FetchError;
use crate::fetch::coordinator::BodyStream;
use crate::transport::declared_content_length;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A resolved HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    stream: Option<BodyStream>,
}

impl Response {
    /// A response whose body was materialized by the executor.
    pub(crate) fn buffered(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body: Some(body),
            stream: None,
        }
    }

    /// A response whose body is still crossing as a stream.
    pub(crate) fn streaming(status: StatusCode, headers: HeaderMap, stream: BodyStream) -> Self {
        Self {
            status,
            headers,
            body: None,
            stream: Some(stream),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The materialized body, absent on streaming responses.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Take the live stream handle for manual consumption.
    /// Can only be taken once - subsequent calls return None.
    pub fn take_stream(&mut self) -> Option<BodyStream> {
        self.stream.take()
    }

    /// Best known size: the materialized length, or the declared length
    /// for a stream still crossing (zero when unknown).
    pub fn known_size(&self) -> u64 {
        match &self.body {
            Some(body) => body.len() as u64,
            None => declared_content_length(&self.headers).unwrap_or(0),
        }
    }

    /// Consume the response into its full body bytes, draining the stream
    /// when one is live.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        match (self.body, self.stream) {
            (Some(body), _) => Ok(body),
            (None, Some(stream)) => stream.drain().await,
            (None, None) => Err(FetchError::Protocol(
                "response body already taken".to_string(),
            )),
        }
    }

    /// Consume the response body as a UTF-8 string.
    pub async fn text(self) -> Result<String, FetchError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| FetchError::Protocol("response body is not valid UTF-8".to_string()))
    }

    /// Consume the response body as JSON, deserializing to type T.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, FetchError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Protocol(format!("response body is not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::coordinator::{self, StreamMsg};

    fn plain_headers() -> HeaderMap {
        HeaderMap::new()
    }

    #[test]
    fn test_buffered_has_body_and_no_stream() {
        let response = Response::buffered(StatusCode::OK, plain_headers(), Bytes::from("hello"));
        assert!(response.body().is_some());
        assert!(!response.is_streaming());
        assert_eq!(response.known_size(), 5);
    }

    #[tokio::test]
    async fn test_streaming_has_stream_and_no_body() {
        let (stream, msgs, _cmds) = coordinator::stub_stream();
        msgs.send(StreamMsg::Chunk(Bytes::from("ab"))).unwrap();
        msgs.send(StreamMsg::End).unwrap();

        let mut response = Response::streaming(StatusCode::OK, plain_headers(), stream);
        assert!(response.body().is_none());
        assert!(response.is_streaming());

        let stream = response.take_stream().unwrap();
        assert!(response.take_stream().is_none());
        assert_eq!(stream.drain().await.unwrap().as_ref(), b"ab");
    }

    #[tokio::test]
    async fn test_bytes_after_take_stream_errors() {
        let (stream, _msgs, _cmds) = coordinator::stub_stream();
        let mut response = Response::streaming(StatusCode::OK, plain_headers(), stream);
        response.take_stream();
        assert!(matches!(
            response.bytes().await,
            Err(FetchError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_text_decodes_utf8() {
        let response = Response::buffered(StatusCode::OK, plain_headers(), Bytes::from("héllo"));
        assert_eq!(response.text().await.unwrap(), "héllo");
    }
}
