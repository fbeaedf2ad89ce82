use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::stream::StreamDialect;
use crate::transport::TransportRequest;
use crate::JsonObject;

use super::decode::decode_object;

const APPLICATION_JSON: &str = "application/json";
const TEXT_EVENT_STREAM: &str = "text/event-stream";

/// One upstream operation: where it lives, what it sends, how its reply is read.
pub trait Endpoint {
    fn method(&self) -> http::Method {
        http::Method::POST
    }

    /// Path relative to the configured base URL, including any query string.
    fn path(&self) -> Cow<'_, str>;

    /// Outbound payload in field order; `None` for bodiless calls.
    fn build_body(&self) -> Option<JsonObject>;

    /// Caller-supplied optional fields, consulted for the `stream` flag.
    fn options(&self) -> Option<&JsonObject> {
        None
    }

    /// Check endpoint-specific required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] describing the first violated rule.
    fn validate(&self) -> Result<(), ClientError>;

    /// Decode a successful (status < 400) response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body is malformed or misses a
    /// required field.
    fn decode(&self, body: &[u8]) -> Result<JsonObject, ClientError> {
        decode_object(body)
    }

    /// SSE dialect used when the call is made with `stream: true`.
    fn stream_dialect(&self) -> Option<StreamDialect> {
        None
    }
}

/// An endpoint bound to credentials, base URL and timeout for one call.
#[derive(Clone)]
pub struct RequestDescriptor<E> {
    endpoint: E,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl<E: Endpoint> RequestDescriptor<E> {
    #[must_use]
    pub fn new(config: &ClientConfig, endpoint: E) -> Self {
        let url = config.endpoint_url(&endpoint.path());
        Self {
            endpoint,
            url,
            api_key: config.api_key.clone(),
            timeout: config.timeout_duration(),
        }
    }

    /// Override the request timeout for this call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    #[must_use]
    pub fn method(&self) -> http::Method {
        self.endpoint.method()
    }

    #[must_use]
    pub fn path(&self) -> Cow<'_, str> {
        self.endpoint.path()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn body(&self) -> Option<JsonObject> {
        self.endpoint.build_body()
    }

    /// True only when the caller explicitly set `stream: true`.
    #[must_use]
    pub fn expects_stream(&self) -> bool {
        self.endpoint
            .options()
            .and_then(|options| options.get("stream"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn stream_dialect(&self) -> Option<StreamDialect> {
        self.endpoint.stream_dialect()
    }

    /// Request headers: bearer token plus JSON or event-stream negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the token cannot be
    /// carried in a header value.
    pub fn headers(&self) -> Result<http::HeaderMap, ClientError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.trim()))
            .map_err(|_| {
                ClientError::Configuration("API key contains invalid header characters".into())
            })?;
        auth.set_sensitive(true);

        let accept = if self.expects_stream() {
            TEXT_EVENT_STREAM
        } else {
            APPLICATION_JSON
        };

        let mut headers = http::HeaderMap::with_capacity(3);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        Ok(headers)
    }

    /// Check credentials and endpoint preconditions before any I/O.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the bearer token is blank and
    /// [`ClientError::Validation`] when endpoint fields are missing or out of range.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::Configuration(
                "API key is not configured".to_string(),
            ));
        }
        self.endpoint.validate()?;
        if self.expects_stream() && self.endpoint.stream_dialect().is_none() {
            return Err(ClientError::Validation(format!(
                "Streaming is not supported for {}",
                self.endpoint.path()
            )));
        }
        Ok(())
    }

    /// Decode a successful non-streaming response body.
    ///
    /// # Errors
    ///
    /// See [`Endpoint::decode`].
    pub fn decode(&self, body: &[u8]) -> Result<JsonObject, ClientError> {
        self.endpoint.decode(body)
    }

    /// Assemble the transport-level request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] for unusable credentials and
    /// [`ClientError::Validation`] when the body cannot be serialized.
    pub fn to_transport_request(&self) -> Result<TransportRequest, ClientError> {
        let body = match self.body() {
            Some(body) => Some(Bytes::from(serde_json::to_vec(&body).map_err(|e| {
                ClientError::Validation(format!("Failed to serialize request body: {e}"))
            })?)),
            None => None,
        };
        Ok(TransportRequest {
            method: self.method(),
            url: self.url.clone(),
            headers: self.headers()?,
            body,
            timeout: self.timeout,
        })
    }
}

impl<E> std::fmt::Debug for RequestDescriptor<E>
where
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("endpoint", &self.endpoint)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Shared field checks
// ---------------------------------------------------------------------------

pub(crate) fn require_non_blank(value: &str, field: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Check that an optional numeric option lies in `[min, max]`.
pub(crate) fn check_option_range(
    options: &JsonObject,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ClientError> {
    let Some(value) = options.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(ClientError::Validation(format!("{key} must be a number")));
    };
    if number < min || number > max {
        return Err(ClientError::Validation(format!(
            "{key} must be between {min} and {max}"
        )));
    }
    Ok(())
}

/// Check that an optional numeric option is at least `min`.
pub(crate) fn check_option_min(options: &JsonObject, key: &str, min: f64) -> Result<(), ClientError> {
    match options.get(key).and_then(Value::as_f64) {
        Some(number) if number < min => Err(ClientError::Validation(format!(
            "{key} must be at least {min}"
        ))),
        _ => check_option_range(options, key, min, f64::MAX),
    }
}

/// Append caller options after the required fields; required fields win.
pub(crate) fn merge_options(body: &mut JsonObject, options: &JsonObject) {
    for (key, value) in options {
        if !body.contains_key(key) {
            body.insert(key.clone(), value.clone());
        }
    }
}
