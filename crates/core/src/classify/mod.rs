//! Request classification: is a request cacheable, and with which strategy.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. non-GET methods bypass
//! 2. `.txt` paths bypass (control data, always fresh)
//! 3. cache-busting query parameters bypass (when the policy honors them)
//! 4. loopback hosts bypass (when the policy asks for it)
//! 5. blacklisted hosts bypass, even when also allow-listed
//! 6. cross-origin hosts not on the allow-list bypass
//! 7. paths outside the extension whitelist bypass (when there is one)
//! 8. otherwise the policy's strategy rules pick a strategy
//!
//! Classification never fails.

pub mod domains;
pub mod policy;
pub mod request;

use url::Url;

pub use domains::{DomainSet, parse_domain_list};
pub use policy::{CachePolicy, PathMatch, PolicyPreset, StrategyKind, StrategyRule};
pub use request::RequestDescriptor;

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    Method,
    TextResource,
    CacheBusting,
    Loopback,
    Blacklisted,
    ForeignOrigin,
    Extension,
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Bypass(BypassReason),
    Cache(StrategyKind),
}

impl Decision {
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Decision::Cache(_))
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        match self {
            Decision::Cache(kind) => Some(*kind),
            Decision::Bypass(_) => None,
        }
    }
}

/// Classifier configuration: serving origin, policy and domain lists.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    policy: CachePolicy,
    allowed: DomainSet,
    blacklist: DomainSet,
}

impl Classifier {
    pub fn new(origin: Url, policy: CachePolicy, allowed: DomainSet, blacklist: DomainSet) -> Self {
        Self { origin, policy, allowed, blacklist }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn allowed(&self) -> &DomainSet {
        &self.allowed
    }

    pub fn blacklist(&self) -> &DomainSet {
        &self.blacklist
    }

    /// Append hostnames to the allow-list. Returns how many were new.
    pub fn extend_allowed<I, S>(&mut self, hosts: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(hosts)
    }

    pub fn classify(&self, request: &RequestDescriptor) -> Decision {
        match self.bypass_reason(request) {
            Some(reason) => Decision::Bypass(reason),
            None => Decision::Cache(self.select_strategy(request)),
        }
    }

    fn bypass_reason(&self, request: &RequestDescriptor) -> Option<BypassReason> {
        let host = request.host();

        if !request.is_get() {
            return Some(BypassReason::Method);
        }
        if request.path().ends_with(".txt") {
            return Some(BypassReason::TextResource);
        }
        if self.policy.honor_cache_busting && request.has_cache_busting_param() {
            return Some(BypassReason::CacheBusting);
        }
        if self.policy.skip_loopback && request.is_loopback() {
            return Some(BypassReason::Loopback);
        }
        if self.blacklist.matches(host) {
            return Some(BypassReason::Blacklisted);
        }
        if request.is_cross_origin(&self.origin) && !self.allowed.matches(host) {
            return Some(BypassReason::ForeignOrigin);
        }
        if let Some(extensions) = &self.policy.extension_whitelist
            && !request.path_ends_with_any(extensions.as_slice())
        {
            return Some(BypassReason::Extension);
        }
        None
    }

    fn select_strategy(&self, request: &RequestDescriptor) -> StrategyKind {
        let path = request.path();
        self.policy
            .rules
            .iter()
            .find(|rule| match &rule.matcher {
                PathMatch::Contains(needle) => path.contains(needle.as_str()),
                PathMatch::EndsWithAny(suffixes) => request.path_ends_with_any(suffixes.as_slice()),
                PathMatch::AllowedCrossOriginImage => {
                    policy::is_image_path(path)
                        && request.is_cross_origin(&self.origin)
                        && self.allowed.matches(request.host())
                }
            })
            .map(|rule| rule.strategy)
            .unwrap_or(self.policy.fallback)
    }
}
