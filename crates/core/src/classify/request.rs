//! Request descriptors and the URL predicates the classifier works from.

use url::Url;

use crate::Error;
use crate::cache::CacheKey;

/// Query parameters that mark a request as cache-busting when present.
const CACHE_BUST_PARAMS: &[&str] = &["cacheBust", "cachebust", "bust"];

/// An intercepted request: method, absolute URL and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Build a descriptor from a method and an absolute http(s) URL.
    pub fn new(method: &str, url: &str) -> Result<Self, Error> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Self::from_url(method, parsed)
    }

    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url)
    }

    pub fn from_url(method: &str, url: Url) -> Result<Self, Error> {
        let method = method.trim();
        if method.is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
        }
        Ok(Self { method: method.to_ascii_uppercase(), url, headers: Vec::new() })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Same scheme, host and port as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }

    pub fn is_cross_origin(&self, origin: &Url) -> bool {
        !self.is_same_origin(origin)
    }

    /// Case-sensitive suffix match of the path against any of `suffixes`.
    pub fn path_ends_with_any<S: AsRef<str>>(&self, suffixes: &[S]) -> bool {
        let path = self.path();
        suffixes.iter().any(|s| path.ends_with(s.as_ref()))
    }

    /// `cache=false`, or any of `cacheBust`, `cachebust`, `bust` present.
    pub fn has_cache_busting_param(&self) -> bool {
        self.url
            .query_pairs()
            .any(|(k, v)| (k == "cache" && v == "false") || CACHE_BUST_PARAMS.iter().any(|p| *p == k))
    }

    /// Host is `localhost`, `127.0.0.1` or `[::1]`.
    pub fn is_loopback(&self) -> bool {
        matches!(self.host(), "localhost" | "127.0.0.1" | "[::1]")
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_request(&self.method, self.url.as_str())
    }
}
