//! The origin fetcher seam.
//!
//! The engine does not perform network I/O itself. It hands a request and a
//! set of [`FetchOptions`] to an [`OriginFetcher`] and gets back either a
//! response (any status) or a failure.

use async_trait::async_trait;
use url::Url;

use crate::classify::RequestDescriptor;
use crate::{Error, Response};

/// Request mode, mirroring the Fetch standard's `mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestMode {
    #[default]
    SameOrigin,
    Cors,
}

/// Credential policy, mirroring the Fetch standard's `credentials`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialsPolicy {
    Omit,
    #[default]
    SameOrigin,
    Include,
}

/// Options passed along with each origin fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub mode: RequestMode,
    pub credentials: CredentialsPolicy,
    /// The serving origin. Sent as `Origin` in CORS mode and used to decide
    /// whether same-origin credentials may be attached.
    pub origin: Option<Url>,
}

impl FetchOptions {
    /// Options for fetching `request` on behalf of `origin`.
    ///
    /// Cross-origin targets get CORS mode with same-origin credentials, so
    /// cookies and authorization never reach third-party hosts.
    pub fn for_request(request: &RequestDescriptor, origin: &Url) -> Self {
        let mode = if request.is_cross_origin(origin) { RequestMode::Cors } else { RequestMode::SameOrigin };
        Self { mode, credentials: CredentialsPolicy::SameOrigin, origin: Some(origin.clone()) }
    }

    /// Whether credentials may be attached when fetching `target`.
    ///
    /// Same-origin credentials need a known serving origin to compare against.
    pub fn sends_credentials(&self, target: &Url) -> bool {
        match self.credentials {
            CredentialsPolicy::Omit => false,
            CredentialsPolicy::Include => true,
            CredentialsPolicy::SameOrigin => self
                .origin
                .as_ref()
                .is_some_and(|origin| origin.origin() == target.origin()),
        }
    }
}

/// Performs the actual network retrieval for a request.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch `request`. Non-2xx statuses are `Ok`; only failures to obtain a
    /// response at all are `Err`.
    async fn fetch(&self, request: &RequestDescriptor, options: &FetchOptions) -> Result<Response, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://ccported.test").unwrap()
    }

    #[test]
    fn test_same_origin_options() {
        let req = RequestDescriptor::get("https://ccported.test/index.html").unwrap();
        let opts = FetchOptions::for_request(&req, &origin());
        assert_eq!(opts.mode, RequestMode::SameOrigin);
        assert_eq!(opts.credentials, CredentialsPolicy::SameOrigin);
        assert!(opts.sends_credentials(req.url()));
    }

    #[test]
    fn test_cross_origin_options_withhold_credentials() {
        let req = RequestDescriptor::get("https://cdn.ccgstatic.com/a.png").unwrap();
        let opts = FetchOptions::for_request(&req, &origin());
        assert_eq!(opts.mode, RequestMode::Cors);
        assert_eq!(opts.credentials, CredentialsPolicy::SameOrigin);
        assert!(!opts.sends_credentials(req.url()));
    }

    #[test]
    fn test_explicit_policies() {
        let target = Url::parse("https://cdn.ccgstatic.com/a.png").unwrap();
        let include = FetchOptions { credentials: CredentialsPolicy::Include, ..Default::default() };
        let omit = FetchOptions { credentials: CredentialsPolicy::Omit, ..Default::default() };
        assert!(include.sends_credentials(&target));
        assert!(!omit.sends_credentials(&target));
        assert!(!FetchOptions::default().sends_credentials(&target));
    }

    #[test]
    fn test_same_origin_policy_without_origin_withholds_credentials() {
        let opts = FetchOptions::default();
        assert_eq!(opts.credentials, CredentialsPolicy::SameOrigin);
        assert!(!opts.sends_credentials(&origin()));
        assert!(!opts.sends_credentials(&Url::parse("https://www.google-analytics.com/collect").unwrap()));
    }
}
