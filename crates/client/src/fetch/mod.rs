//! HTTP fetch against origin servers.
//!
//! ### Contract
//! - Every HTTP status is a successful fetch; only transport problems are errors.
//! - Caller-supplied headers are sent as-is (`If-Modified-Since`, `Accept-Encoding`).
//! - Bodies are never decoded here; see [`decode`] for gzip handling.
//!
//! ### Safety Gates
//! - Only absolute `http`/`https` URLs are fetched.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable). With `allow_truncated` the body is
//!   cut at the limit instead of failing.
//! - Whole request bounded by a timeout; expiry is a transport error.

pub mod decode;
pub mod url;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, parse_origin_url};
pub use decode::decode_body;

use pagetitle_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pagetitle/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "pagetitle/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// A single GET against an origin.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: header::HeaderMap,
    /// Keep the first `max_bytes` of an oversized body instead of failing.
    pub allow_truncated: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), headers: header::HeaderMap::new(), allow_truncated: true }
    }

    /// Add a header, replacing any earlier value for the same name.
    pub fn header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// What the origin answered.
#[derive(Debug, Clone)]
pub struct OriginResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Raw body bytes, still content-encoded
    pub body: Bytes,
    /// Whether the body was cut at the byte limit
    pub truncated: bool,
}

impl OriginResponse {
    /// Content-Type header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Performs GET requests against origin servers.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch `request.url` with `request.headers`.
    ///
    /// Returns `Err` only when no HTTP response was obtained.
    async fn fetch(&self, request: &FetchRequest) -> Result<OriginResponse, Error>;
}

/// reqwest-backed origin fetcher.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::Transport(err.to_string())
    }
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl OriginFetcher for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<OriginResponse, Error> {
        let start = Instant::now();
        let url = parse_origin_url(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut response = self
            .http
            .get(url.as_str())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let max = self.config.max_bytes;

        if !request.allow_truncated
            && let Some(len) = response.content_length()
            && len as usize > max
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, max)));
        }

        let mut body = BytesMut::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            let room = max - body.len();
            if chunk.len() > room {
                if !request.allow_truncated {
                    return Err(Error::FetchTooLarge(format!("body exceeds {} bytes", max)));
                }
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            truncated,
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched origin"
        );

        Ok(OriginResponse { status, headers, body: body.freeze(), truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(max_bytes: usize) -> FetchClient {
        FetchClient::new(FetchConfig { max_bytes, timeout: Duration::from_millis(500), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "pagetitle/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(|req: &wiremock::Request| {
                req.headers
                    .get("if-modified-since")
                    .is_some_and(|v| v == "Mon, 01 Jan 2024 00:00:00 GMT")
            })
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&server)
            .await;

        let request = FetchRequest::new(format!("{}/page", server.uri())).header(
            header::IF_MODIFIED_SINCE,
            header::HeaderValue::from_static("Mon, 01 Jan 2024 00:00:00 GMT"),
        );
        let response = client(1024).fetch(&request).await.unwrap();

        assert_eq!(response.status, StatusCode::NOT_MODIFIED);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let response = client(1024).fetch(&FetchRequest::new(server.uri())).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(&response.body[..], b"gone");
    }

    #[tokio::test]
    async fn test_body_truncated_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let response = client(100).fetch(&FetchRequest::new(server.uri())).await.unwrap();
        assert_eq!(response.body.len(), 100);
        assert!(response.truncated);
    }

    #[tokio::test]
    async fn test_oversized_body_without_truncation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let request = FetchRequest { allow_truncated: false, ..FetchRequest::new(server.uri()) };
        let result = client(100).fetch(&request).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = client(1024).fetch(&FetchRequest::new(server.uri())).await.unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_error() {
        let err = client(1024).fetch(&FetchRequest::new("not a url")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let err = client(1024)
            .fetch(&FetchRequest::new("http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
