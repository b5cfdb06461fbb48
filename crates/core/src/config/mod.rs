//! Application configuration with layered loading.
//!
//! Configuration is loaded with figment from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Environment variables (SWCACHE_*)
//!
//! List fields take figment array syntax in the environment, e.g.
//! `SWCACHE_ALLOWED_DOMAINS='["ccgstatic.com","cdn.example.net"]'`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::{CachePolicy, Classifier, DomainSet, PolicyPreset};
use crate::lifecycle::WorkerSettings;

mod validation;

pub use validation::ConfigError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache store.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Product prefix shared by every cache generation.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Current cache version. Bumping it supersedes older generations.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Serving origin. Requests to other origins are cross-origin.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Caching policy preset.
    #[serde(default)]
    pub preset: PolicyPreset,

    /// Age in days after which a tracked URL is stale.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Cross-origin hosts (substring match) whose responses may be cached.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Hosts (substring match) that are never cached. Wins over `allowed_domains`.
    #[serde(default = "default_blacklisted_domains")]
    pub blacklisted_domains: Vec<String>,

    /// Assets warmed at install, resolved against `origin`.
    #[serde(default = "default_precache_assets")]
    pub precache_assets: Vec<String>,

    /// Remote allow-list resource, resolved against `origin`.
    #[serde(default = "default_domain_list_path")]
    pub domain_list_path: Option<String>,

    /// Never cache requests to localhost.
    #[serde(default)]
    pub skip_loopback: bool,

    /// User-Agent string for origin requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_cache_prefix() -> String {
    "ccported-cache-".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_max_age_days() -> u32 {
    7
}

fn default_allowed_domains() -> Vec<String> {
    vec!["ccgstatic.com".into()]
}

fn default_blacklisted_domains() -> Vec<String> {
    ["pagead2.googlesyndication.com", "storage.ko-fi.com", "www.google-analytics.com", "amazonaws.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_precache_assets() -> Vec<String> {
    vec!["./index.html".into()]
}

fn default_domain_list_path() -> Option<String> {
    Some("/servers.txt".into())
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            preset: PolicyPreset::default(),
            max_age_days: default_max_age_days(),
            allowed_domains: default_allowed_domains(),
            blacklisted_domains: default_blacklisted_domains(),
            precache_assets: default_precache_assets(),
            domain_list_path: default_domain_list_path(),
            skip_loopback: false,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file or environment cannot be
    /// parsed, or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Name of the current cache generation.
    pub fn generation_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.cache_version)
    }

    pub fn max_age_ms(&self) -> i64 {
        i64::from(self.max_age_days) * DAY_MS
    }

    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL".into() });
        }
        Ok(url)
    }

    /// Precache assets as absolute URLs.
    pub fn precache_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let origin = self.origin_url()?;
        self.precache_assets
            .iter()
            .map(|asset| {
                origin.join(asset).map_err(|e| ConfigError::Invalid {
                    field: "precache_assets".into(),
                    reason: format!("{asset}: {e}"),
                })
            })
            .collect()
    }

    pub fn domain_list_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(path) = &self.domain_list_path else {
            return Ok(None);
        };
        self.origin_url()?
            .join(path)
            .map(Some)
            .map_err(|e| ConfigError::Invalid { field: "domain_list_path".into(), reason: e.to_string() })
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy::for_preset(self.preset).with_skip_loopback(self.skip_loopback)
    }

    /// Classifier for the configured origin, policy and domain lists.
    pub fn classifier(&self) -> Result<Classifier, ConfigError> {
        Ok(Classifier::new(
            self.origin_url()?,
            self.policy(),
            DomainSet::new(self.allowed_domains.iter().cloned()),
            DomainSet::new(self.blacklisted_domains.iter().cloned()),
        ))
    }

    pub fn worker_settings(&self) -> Result<WorkerSettings, ConfigError> {
        Ok(WorkerSettings {
            cache_prefix: self.cache_prefix.clone(),
            cache_version: self.cache_version.clone(),
            origin: self.origin_url()?,
            precache: self.precache_urls()?,
            domain_list: self.domain_list_url()?,
            max_age_ms: self.max_age_ms(),
        })
    }
}
