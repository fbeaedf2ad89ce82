use crate::transport::TransportError;

/// Error type surfaced by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<TransportError>,
    },
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Broad error category for callers deciding what to do with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    InvalidRequest,
    Authentication,
    Permission,
    RateLimit,
    ServerError,
    Transport,
    Decode,
    Unknown,
}

/// Map an upstream HTTP status code to an error category.
#[must_use]
pub fn category_from_upstream_status(status: u16) -> ErrorCategory {
    match status {
        400 | 404 | 422 => ErrorCategory::InvalidRequest,
        401 => ErrorCategory::Authentication,
        403 => ErrorCategory::Permission,
        429 => ErrorCategory::RateLimit,
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::Unknown,
    }
}

impl ClientError {
    /// Build the error for an upstream response with status >= 400.
    #[must_use]
    pub fn upstream(status: u16, body: &[u8]) -> Self {
        let detail = upstream_error_message(body);
        ClientError::Api {
            status: Some(status),
            message: format!("API request failed with status {status}: {detail}"),
            source: None,
        }
    }

    /// Wrap a transport-level failure, keeping it as the error source.
    #[must_use]
    pub fn transport(err: TransportError) -> Self {
        ClientError::Api {
            status: None,
            message: format!("API request failed: {err}"),
            source: Some(err),
        }
    }

    /// HTTP status of the upstream response, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => *status,
            _ => None,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Configuration(_) => ErrorCategory::Configuration,
            ClientError::Validation(_) => ErrorCategory::InvalidRequest,
            ClientError::Decode(_) => ErrorCategory::Decode,
            ClientError::Api {
                status: Some(status),
                ..
            } => category_from_upstream_status(*status),
            ClientError::Api { status: None, .. } => ErrorCategory::Transport,
        }
    }
}

/// Best-effort extraction of the upstream error text.
///
/// Uses `error.message` when the body is JSON carrying it, otherwise the raw
/// body decoded as lossy UTF-8.
#[must_use]
pub fn upstream_error_message(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(msg) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
    }
    String::from_utf8_lossy(body).into_owned()
}
