//! Request URL canonicalization.
//!
//! Callers hand in URLs the way a page would reference them: absolute, bare
//! host, or relative to the serving origin. The cache key is derived from the
//! canonical form, so two spellings of one resource share an entry.

use url::Url;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("relative URL without a base: {0}")]
    RelativeWithoutBase(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL.
///
/// 1. Trim surrounding whitespace
/// 2. Resolve `/path`, `./path` and `../path` against `base`
/// 3. Default a bare host to `https://`
/// 4. Require http(s), lowercase the host, drop the fragment
///
/// The query string is kept as-is; cache-busting parameters live there.
pub fn canonicalize(input: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    } else if trimmed.starts_with('/') || trimmed.starts_with('.') {
        let base = base.ok_or_else(|| UrlError::RelativeWithoutBase(trimmed.to_string()))?;
        base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    } else {
        Url::parse(&format!("https://{trimmed}")).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }
    parsed.set_fragment(None);

    Ok(parsed)
}
