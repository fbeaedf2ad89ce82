use std::time::Duration;

use futures_util::StreamExt;

use crate::config::ClientConfig;

use super::{StreamingResponse, Transport, TransportError, TransportRequest, TransportResponse};

fn build_reqwest_client(config: &ClientConfig) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(config.http_pool_max_idle_per_host)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .redirect(reqwest::redirect::Policy::none());

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|err| TransportError::InvalidUrl(format!("Invalid proxy URL: {err}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|err| TransportError::Request(format!("Failed to build HTTP client: {err}")))
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with pool, connect timeout and proxy settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the proxy URL is invalid or the client
    /// cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }

    fn build_request(&self, request: TransportRequest) -> Result<reqwest::Request, TransportError> {
        let url = url::Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", request.url)))?;
        let mut outbound = reqwest::Request::new(request.method, url);
        *outbound.headers_mut() = request.headers;
        *outbound.timeout_mut() = Some(request.timeout);
        if let Some(body) = request.body {
            *outbound.body_mut() = Some(reqwest::Body::from(body));
        }
        Ok(outbound)
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let outbound = self.build_request(request)?;
        let response = self.client.execute(outbound).await?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }

    async fn send_stream(
        &self,
        request: TransportRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let outbound = self.build_request(request)?;
        let response = self.client.execute(outbound).await?;
        let status = response.status();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string())));
        Ok(StreamingResponse::new(status, Box::pin(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> TransportRequest {
        TransportRequest {
            method: http::Method::POST,
            url: url.to_string(),
            headers: http::HeaderMap::new(),
            body: Some(bytes::Bytes::from_static(b"{}")),
            timeout: Duration::from_secs(7),
        }
    }

    #[test]
    fn test_build_request_applies_timeout_and_body() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("https://api.example.com/v1", "k")).unwrap();
        let outbound = transport
            .build_request(request("https://api.example.com/v1/chat/completions"))
            .unwrap();
        assert_eq!(outbound.method(), http::Method::POST);
        assert_eq!(outbound.timeout(), Some(&Duration::from_secs(7)));
        assert!(outbound.body().is_some());
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("https://api.example.com/v1", "k")).unwrap();
        let err = transport.build_request(request("://bad-url")).unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let mut config = ClientConfig::new("https://api.example.com/v1", "k");
        config.proxy = Some("http://[::1".to_string());
        assert!(ReqwestTransport::new(&config).is_err());
    }
}
