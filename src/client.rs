use std::time::Instant;

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{error, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::observability::log_response_usage;
use crate::observability::redact::redact_headers;
use crate::protocol::{Endpoint, NormalizedResponse, RequestDescriptor};
use crate::stream::{self, line_stream, StreamDialect};
use crate::transport::{ByteStream, ReqwestTransport, Transport, TransportRequest};
use crate::JsonObject;

/// Entry point for calling the upstream API.
///
/// Every call is one sequential attempt: validate, send, then decode or
/// aggregate. Nothing is retried.
#[derive(Debug, Clone)]
pub struct Client<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
}

impl Client<ReqwestTransport> {
    /// Build a client over a pooled `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the HTTP client cannot be
    /// built from `config` (for example an invalid proxy URL).
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)
            .map_err(|err| ClientError::Configuration(err.to_string()))?;
        Ok(Self { config, transport })
    }
}

impl<T: Transport> Client<T> {
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bind an endpoint to this client's base URL, token and timeout.
    #[must_use]
    pub fn descriptor<E: Endpoint>(&self, endpoint: E) -> RequestDescriptor<E> {
        RequestDescriptor::new(&self.config, endpoint)
    }

    /// Issue a non-streaming call and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] or [`ClientError::Validation`] before
    /// any I/O, [`ClientError::Api`] for transport failures and statuses
    /// >= 400, [`ClientError::Decode`] for malformed bodies.
    pub async fn send<E: Endpoint>(
        &self,
        descriptor: &RequestDescriptor<E>,
    ) -> Result<JsonObject, ClientError> {
        let request = prepare(descriptor)?;
        let url = request.url.clone();
        let started = Instant::now();

        let response = self.transport.send(request).await.map_err(|err| {
            let err = ClientError::transport(err);
            error!(url = %url, error = %err, "API request failed");
            err
        })?;
        let status = response.status.as_u16();
        info!(
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API response received"
        );

        if status >= 400 {
            let err = ClientError::upstream(status, &response.body);
            error!(url = %url, status, error = %err, "API request failed");
            return Err(err);
        }

        let decoded = descriptor.decode(&response.body).inspect_err(|err| {
            error!(url = %url, error = %err, "failed to decode API response");
        })?;
        log_response_usage(&descriptor.path(), &decoded, started.elapsed());
        Ok(decoded)
    }

    /// Issue a call and hand back the body as a stream without decoding it.
    ///
    /// # Errors
    ///
    /// Same pre-flight and transport errors as [`Client::send`]; a status
    /// >= 400 is read in full and reported as [`ClientError::Api`].
    pub async fn send_stream<E: Endpoint>(
        &self,
        descriptor: &RequestDescriptor<E>,
    ) -> Result<StreamHandle, ClientError> {
        let request = prepare(descriptor)?;
        let url = request.url.clone();
        let started = Instant::now();

        let response = self.transport.send_stream(request).await.map_err(|err| {
            let err = ClientError::transport(err);
            error!(url = %url, error = %err, "API stream request failed");
            err
        })?;
        let status = response.status.as_u16();
        info!(
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "API stream opened"
        );

        if status >= 400 {
            let body = response.into_bytes().await.map_err(|err| {
                let err = ClientError::transport(err);
                error!(url = %url, status, error = %err, "failed to read API error body");
                err
            })?;
            let err = ClientError::upstream(status, &body);
            error!(url = %url, status, error = %err, "API stream request failed");
            return Err(err);
        }

        Ok(StreamHandle {
            status,
            body: response.body,
        })
    }

    /// Full round trip returning the normalized JSON map.
    ///
    /// With `stream: true` the body is buffered and folded with the
    /// endpoint's dialect, so callers see the same shape either way.
    ///
    /// # Errors
    ///
    /// Any error from [`Client::send`] or [`Client::send_stream`], plus
    /// [`ClientError::Api`] when the stream body breaks off mid-way.
    pub async fn execute<E: Endpoint>(
        &self,
        descriptor: &RequestDescriptor<E>,
    ) -> Result<JsonObject, ClientError> {
        if !descriptor.expects_stream() {
            return self.send(descriptor).await;
        }
        let Some(dialect) = descriptor.stream_dialect() else {
            let err = ClientError::Validation(format!(
                "Streaming is not supported for {}",
                descriptor.path()
            ));
            error!(path = %descriptor.path(), error = %err, "API request rejected");
            return Err(err);
        };
        let started = Instant::now();
        let handle = self.send_stream(descriptor).await?;
        let aggregated = handle
            .aggregate(dialect)
            .await
            .inspect_err(|err| {
                error!(url = %descriptor.url(), error = %err, "API stream body failed");
            })?
            .into_object();
        log_response_usage(&descriptor.path(), &aggregated, started.elapsed());
        Ok(aggregated)
    }

    /// Shorthand for `execute(&self.descriptor(endpoint))`.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn call<E: Endpoint>(&self, endpoint: E) -> Result<JsonObject, ClientError> {
        let descriptor = self.descriptor(endpoint);
        self.execute(&descriptor).await
    }
}

fn prepare<E: Endpoint>(descriptor: &RequestDescriptor<E>) -> Result<TransportRequest, ClientError> {
    descriptor.validate().inspect_err(|err| {
        error!(path = %descriptor.path(), error = %err, "API request rejected");
    })?;
    let request = descriptor.to_transport_request().inspect_err(|err| {
        error!(path = %descriptor.path(), error = %err, "failed to build API request");
    })?;
    let headers = Value::Object(redact_headers(&request.headers));
    let body = request
        .body
        .as_deref()
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    info!(
        method = %request.method,
        url = %request.url,
        headers = %headers,
        body = %body,
        timeout_secs = request.timeout.as_secs_f64(),
        "sending API request"
    );
    Ok(request)
}

/// A successful response whose body has not been read yet.
pub struct StreamHandle {
    status: u16,
    body: ByteStream,
}

impl StreamHandle {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body lines as they arrive, split on `\r?\n`.
    pub fn lines(self) -> impl Stream<Item = Result<String, ClientError>> + Send {
        line_stream(self.body).map(|line| line.map_err(ClientError::transport))
    }

    /// Buffer the whole body as text.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the body stream fails.
    pub async fn into_text(mut self) -> Result<String, ClientError> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk.map_err(ClientError::transport)?);
        }
        Ok(match String::from_utf8(buf) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    /// Buffer the body and fold it with `dialect`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] when the body stream fails; the fold
    /// itself never fails.
    pub async fn aggregate(self, dialect: StreamDialect) -> Result<NormalizedResponse, ClientError> {
        let text = self.into_text().await?;
        Ok(stream::aggregate(dialect, &text))
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
