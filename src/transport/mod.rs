mod reqwest_transport;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

pub use reqwest_transport::ReqwestTransport;

/// Boxed stream of raw response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Network-level failure, distinct from an HTTP error status.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else if err.is_builder() {
            TransportError::InvalidUrl(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// One fully described outbound HTTP call.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: http::HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// A completed, fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: http::StatusCode,
    pub body: Bytes,
}

/// An HTTP response whose body is still being received.
pub struct StreamingResponse {
    pub status: http::StatusCode,
    pub body: ByteStream,
}

impl StreamingResponse {
    #[must_use]
    pub fn new(status: http::StatusCode, body: ByteStream) -> Self {
        Self { status, body }
    }

    /// Build a streaming response from already-known chunks.
    #[must_use]
    pub fn from_chunks<I>(status: http::StatusCode, chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        let body = futures_util::stream::iter(chunks.into_iter().map(Ok));
        Self::new(status, Box::pin(body))
    }

    /// Drain the body into a single buffer.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`] yielded by the body stream.
    pub async fn into_bytes(mut self) -> Result<Bytes, TransportError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// HTTP transport used by [`crate::Client`].
///
/// Implementations perform exactly one attempt per call; nothing in this
/// crate retries.
pub trait Transport: Send + Sync {
    /// Send a request and buffer the whole response body.
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;

    /// Send a request and hand back the body as a chunk stream.
    fn send_stream(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<StreamingResponse, TransportError>> + Send;
}
