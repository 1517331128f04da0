// =============================================================================
// Delta Exchange REST client: transmits signed orders
// =============================================================================
//
// SECURITY: the API key only travels in the `api-key` header and is redacted
// from `Debug`.  The secret never reaches this module; requests arrive
// already signed.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};

use crate::delta::SignedRequest;
use crate::error::{BotError, BotResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_USER_AGENT: &str = concat!("signal-bot/", env!("CARGO_PKG_VERSION"));

/// Exchange acknowledgement for an accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Transmits a signed order.  Anything other than HTTP 200 is a
/// `BotError::SignSubmit`.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit(&self, request: &SignedRequest) -> BotResult<SubmitResponse>;
}

#[derive(Clone)]
pub struct DeltaClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl DeltaClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "DeltaClient initialised");

        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    /// Header set for one signed request.
    fn headers(&self, request: &SignedRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(&self.api_key).context("api key is not a valid header value")?,
        );
        headers.insert(
            "timestamp",
            HeaderValue::from_str(&request.timestamp).context("invalid timestamp header")?,
        );
        headers.insert(
            "signature",
            HeaderValue::from_str(&request.signature).context("invalid signature header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        Ok(headers)
    }

    /// Send the signed body to `base_url + path` with the signed method.
    #[instrument(skip(self, request), fields(path = %request.path), name = "delta::place_order")]
    async fn post_signed(&self, request: &SignedRequest) -> BotResult<SubmitResponse> {
        let transport = |e: anyhow::Error| BotError::SignSubmit {
            status: None,
            message: format!("{e:#}"),
        };

        let url = format!("{}{}", self.base_url, request.path);
        let headers = self.headers(request).map_err(transport)?;
        let method = Method::from_bytes(request.method.as_bytes())
            .context("invalid HTTP method")
            .map_err(transport)?;

        let resp = self
            .client
            .request(method, &url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .context("order request failed")
            .map_err(transport)?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .context("failed to read order response")
            .map_err(transport)?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), body = %text, "order rejected by exchange");
            return Err(BotError::SignSubmit {
                status: Some(status.as_u16()),
                message: text,
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
        debug!(status = status.as_u16(), "order accepted");

        Ok(SubmitResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl OrderGateway for DeltaClient {
    async fn submit(&self, request: &SignedRequest) -> BotResult<SubmitResponse> {
        self.post_signed(request).await
    }
}

impl std::fmt::Debug for DeltaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed() -> SignedRequest {
        SignedRequest {
            timestamp: "1700000000000".into(),
            method: "POST".into(),
            path: "/v2/orders".into(),
            body: r#"{"a":1}"#.into(),
            signature: "abc123".into(),
        }
    }

    #[test]
    fn headers_carry_auth_fields() {
        let client = DeltaClient::new("my-key", "https://example.test/").unwrap();
        let headers = client.headers(&signed()).unwrap();
        assert_eq!(headers["api-key"], "my-key");
        assert_eq!(headers["timestamp"], "1700000000000");
        assert_eq!(headers["signature"], "abc123");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn bad_api_key_is_rejected() {
        let client = DeltaClient::new("bad\nkey", "https://example.test").unwrap();
        assert!(client.headers(&signed()).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = DeltaClient::new("my-key", "https://example.test").unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("my-key"));
        assert!(dbg.contains("https://example.test"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        // Port 9 on loopback: nothing listens, the connect fails fast.
        let client = DeltaClient::new("k", "http://127.0.0.1:9").unwrap();
        let err = client.submit(&signed()).await.unwrap_err();
        assert!(matches!(err, BotError::SignSubmit { status: None, .. }));
    }
}
