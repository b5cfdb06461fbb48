//! reqwest-backed origin fetcher.
//!
//! ### Fetch options
//! - CORS mode adds an `Origin` header naming the serving origin
//! - Cookies and authorization are stripped when the credential policy
//!   forbids them for the target
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 10MB (configurable)
//! - Request timeout: 20s (configurable)
//!
//! Non-2xx responses are returned as-is; deciding what they mean is up to the
//! retrieval strategy.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

pub use self::url::{UrlError, canonicalize};

use swcache_core::{AppConfig, Error, FetchOptions, OriginFetcher, RequestDescriptor, RequestMode, Response};

/// Headers never forwarded when credentials are withheld.
const CREDENTIAL_HEADERS: &[&str] = &["cookie", "authorization", "proxy-authorization"];

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
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

/// HTTP client implementing [`OriginFetcher`].
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn build_request(
        &self, request: &RequestDescriptor, options: &FetchOptions,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method())))?;
        let mut builder = self.http.request(method, request.url().clone());

        let credentials = options.sends_credentials(request.url());
        for (name, value) in request.headers() {
            let lower = name.to_ascii_lowercase();
            if !credentials && CREDENTIAL_HEADERS.contains(&lower.as_str()) {
                tracing::debug!(url = %request.url(), header = %lower, "withholding credential header");
                continue;
            }
            if lower == "origin" {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if options.mode == RequestMode::Cors
            && let Some(origin) = &options.origin
        {
            builder = builder.header(header::ORIGIN, origin.origin().ascii_serialization());
        }

        Ok(builder)
    }
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

#[async_trait]
impl OriginFetcher for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor, options: &FetchOptions) -> Result<Response, Error> {
        let start = Instant::now();
        let response = self
            .build_request(request, options)?
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(map_send_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            url = %request.url(),
            status,
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "origin fetch complete"
        );

        let mut out = Response::new(request.url().as_str(), status, bytes);
        out.headers = headers;
        Ok(out)
    }
}
