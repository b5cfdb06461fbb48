//! Cacheability and strategy policy, with the `site` and `game` presets.
//!
//! The site-level worker caches a fixed set of media/code/document types and
//! prefers time-aware cache-first. The game-asset worker caches everything
//! not explicitly busted and prefers stale-while-revalidate. Both are the
//! same [`CachePolicy`] with different settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extensions the site preset is willing to cache.
pub const SITE_EXTENSIONS: &[&str] = &[
    ".html", ".js", ".css", ".json", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".woff", ".woff2", ".ttf",
    ".otf", ".mp3", ".ogg", ".wav", ".mp4", ".webm",
];

/// Image extensions, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Retrieval strategy for a cacheable request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    NetworkFirst,
    CacheFirst,
    TimeAwareCacheFirst,
    StaleWhileRevalidate,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::NetworkFirst => "network_first",
            StrategyKind::CacheFirst => "cache_first",
            StrategyKind::TimeAwareCacheFirst => "time_aware_cache_first",
            StrategyKind::StaleWhileRevalidate => "stale_while_revalidate",
        };
        f.write_str(name)
    }
}

/// Named policy presets selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    #[default]
    Site,
    Game,
}

/// What a strategy rule looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Path contains the substring.
    Contains(String),
    /// Path ends with any of the suffixes (case-sensitive).
    EndsWithAny(Vec<String>),
    /// Image extension served from an allow-listed cross-origin host.
    AllowedCrossOriginImage,
}

/// One `matcher -> strategy` rule. Rules are tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyRule {
    pub matcher: PathMatch,
    pub strategy: StrategyKind,
}

impl StrategyRule {
    pub fn new(matcher: PathMatch, strategy: StrategyKind) -> Self {
        Self { matcher, strategy }
    }
}

/// Tunable classification policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Bypass requests carrying a cache-busting query parameter.
    pub honor_cache_busting: bool,
    /// Bypass requests to loopback hosts.
    pub skip_loopback: bool,
    /// Only these path suffixes are cacheable. `None` allows any.
    pub extension_whitelist: Option<Vec<String>>,
    pub rules: Vec<StrategyRule>,
    /// Strategy when no rule matches.
    pub fallback: StrategyKind,
}

fn suffixes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl CachePolicy {
    /// Site-level worker: extension whitelist, `game_` paths cache-first.
    pub fn site() -> Self {
        Self {
            honor_cache_busting: false,
            skip_loopback: false,
            extension_whitelist: Some(suffixes(SITE_EXTENSIONS)),
            rules: vec![
                StrategyRule::new(PathMatch::Contains("game_".into()), StrategyKind::CacheFirst),
                StrategyRule::new(
                    PathMatch::EndsWithAny(suffixes(&[".html", ".json", ".txt"])),
                    StrategyKind::NetworkFirst,
                ),
                StrategyRule::new(PathMatch::AllowedCrossOriginImage, StrategyKind::TimeAwareCacheFirst),
            ],
            fallback: StrategyKind::TimeAwareCacheFirst,
        }
    }

    /// Game-asset worker: honors cache busting, defaults to
    /// stale-while-revalidate.
    pub fn game() -> Self {
        Self {
            honor_cache_busting: true,
            skip_loopback: false,
            extension_whitelist: None,
            rules: vec![
                StrategyRule::new(PathMatch::Contains("game_".into()), StrategyKind::TimeAwareCacheFirst),
                StrategyRule::new(PathMatch::EndsWithAny(suffixes(&[".html", ".json"])), StrategyKind::NetworkFirst),
            ],
            fallback: StrategyKind::StaleWhileRevalidate,
        }
    }

    pub fn for_preset(preset: PolicyPreset) -> Self {
        match preset {
            PolicyPreset::Site => Self::site(),
            PolicyPreset::Game => Self::game(),
        }
    }

    pub fn with_skip_loopback(mut self, skip: bool) -> Self {
        self.skip_loopback = skip;
        self
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::site()
    }
}

/// Case-insensitive image extension check on a path.
pub fn is_image_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
