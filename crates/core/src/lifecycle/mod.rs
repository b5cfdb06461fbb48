//! Worker lifecycle: install, activate, the fetch hook and control messages.
//!
//! A [`CacheWorker`] starts out `installing`. [`install`](CacheWorker::install)
//! extends the allow-list from the remote domain list, warms the current
//! generation with the precache list and moves to `installed`. A failed warm-up
//! leaves the worker `redundant`. [`activate`](CacheWorker::activate) deletes
//! superseded generations and moves to `active`. Only an active worker routes
//! requests through the strategies; before that every request passes through.

pub mod control;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::cache::{CacheStore, Generation};
use crate::classify::{Classifier, Decision, RequestDescriptor, parse_domain_list};
use crate::clock::Clock;
use crate::fetch::{FetchOptions, OriginFetcher};
use crate::metadata::MetadataStore;
use crate::strategy::{Strategies, StrategyOutcome};
use crate::{Error, Response};

pub use control::{ControlCommand, ControlReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Active,
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Static worker settings resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Product prefix shared by every generation, e.g. `ccported-cache-`.
    pub cache_prefix: String,
    pub cache_version: String,
    pub origin: Url,
    /// Absolute URLs warmed at install.
    pub precache: Vec<Url>,
    /// Remote allow-list resource, fetched at install.
    pub domain_list: Option<Url>,
    pub max_age_ms: i64,
}

impl WorkerSettings {
    /// Name of the current generation: prefix + version.
    pub fn generation_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.cache_version)
    }

    /// Reserved key the metadata mapping is stored under.
    pub fn metadata_key(&self) -> String {
        format!("{}metadata", self.cache_prefix)
    }
}

/// Snapshot reported by [`CacheWorker::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub generation: String,
    pub tracked_urls: usize,
}

pub struct CacheWorker {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn OriginFetcher>,
    classifier: RwLock<Classifier>,
    settings: WorkerSettings,
    strategies: Strategies,
    state: RwLock<LifecycleState>,
}

impl fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheWorker")
            .field("settings", &self.settings)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl CacheWorker {
    pub fn new(
        store: Arc<dyn CacheStore>, fetcher: Arc<dyn OriginFetcher>, classifier: Classifier, settings: WorkerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let generation = Generation::new(store.clone(), &settings.generation_name());
        let metadata = MetadataStore::new(generation.clone(), &settings.metadata_key(), clock);
        let strategies = Strategies::new(
            generation,
            metadata,
            fetcher.clone(),
            settings.origin.clone(),
            settings.max_age_ms,
        );

        Self {
            store,
            fetcher,
            classifier: RwLock::new(classifier),
            settings,
            strategies,
            state: RwLock::new(LifecycleState::Installing),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn generation(&self) -> &Generation {
        self.strategies.generation()
    }

    pub fn metadata(&self) -> &MetadataStore {
        self.strategies.metadata()
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        let previous = *state;
        tracing::info!(from = %previous, to = %next, generation = self.generation().name(), "lifecycle transition");
        *state = next;
    }

    /// Snapshot of the classifier, including hosts added at install.
    pub async fn classifier(&self) -> Classifier {
        self.classifier.read().await.clone()
    }

    /// Append hostnames to the allow-list. Returns how many were new.
    pub async fn extend_allowed<I, S>(&self, hosts: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier.write().await.extend_allowed(hosts)
    }

    /// Install: load the domain list, warm the cache and stamp the warmed URLs.
    ///
    /// Warming is all-or-nothing. If any precache fetch fails the worker
    /// becomes redundant and the error is returned.
    pub async fn install(&self) -> Result<(), Error> {
        let current = self.state().await;
        if current != LifecycleState::Installing {
            return Err(Error::Lifecycle(format!("cannot install from state {current}")));
        }

        self.load_domain_list().await;

        if let Err(e) = self.precache().await {
            tracing::error!(error = %e, "precache failed, worker is redundant");
            self.set_state(LifecycleState::Redundant).await;
            return Err(Error::Lifecycle(format!("install failed: {e}")));
        }

        self.set_state(LifecycleState::Installed).await;
        // skip waiting: an installed worker may activate at once
        Ok(())
    }

    /// Fetch the remote domain list and extend the allow-list with it.
    ///
    /// Best-effort: any failure is logged and install goes on.
    async fn load_domain_list(&self) {
        let Some(url) = &self.settings.domain_list else {
            return;
        };

        let request = match RequestDescriptor::from_url("GET", url.clone()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "invalid domain list url");
                return;
            }
        };

        let options = FetchOptions::for_request(&request, &self.settings.origin);
        match self.fetcher.fetch(&request, &options).await {
            Ok(response) if response.is_ok() => {
                let text = String::from_utf8_lossy(&response.body);
                let added = self.extend_allowed(parse_domain_list(&text)).await;
                tracing::info!(url = %url, added, "extended allow-list from domain list");
            }
            Ok(response) => {
                tracing::warn!(url = %url, status = response.status, "domain list fetch returned non-ok status");
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "domain list fetch failed");
            }
        }
    }

    async fn precache(&self) -> Result<(), Error> {
        let generation = Generation::open(self.store.clone(), &self.settings.generation_name()).await?;

        let mut fetched: Vec<(RequestDescriptor, Response)> = Vec::with_capacity(self.settings.precache.len());
        for url in &self.settings.precache {
            let request = RequestDescriptor::from_url("GET", url.clone())?;
            let options = FetchOptions::for_request(&request, &self.settings.origin);
            let response = self.fetcher.fetch(&request, &options).await?;
            if !response.is_ok() {
                return Err(Error::HttpError(response.status));
            }
            fetched.push((request, response));
        }

        for (request, response) in &fetched {
            generation.put(&request.cache_key(), response).await?;
        }
        self.metadata()
            .touch_all(fetched.iter().map(|(request, _)| request.url().as_str()))
            .await?;

        tracing::info!(count = fetched.len(), generation = generation.name(), "precached assets");
        Ok(())
    }

    /// Activate: delete superseded generations and start routing requests.
    ///
    /// Returns the names of the deleted generations.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let current = self.state().await;
        if current != LifecycleState::Installed {
            return Err(Error::Lifecycle(format!("cannot activate from state {current}")));
        }
        self.set_state(LifecycleState::Activating).await;

        let removed = match self.collect_old_generations().await {
            Ok(removed) => removed,
            Err(e) => {
                self.set_state(LifecycleState::Installed).await;
                return Err(e);
            }
        };

        self.set_state(LifecycleState::Active).await;
        tracing::info!(removed = removed.len(), "worker active, clients claimed");
        Ok(removed)
    }

    async fn collect_old_generations(&self) -> Result<Vec<String>, Error> {
        let current = self.settings.generation_name();
        let mut removed = Vec::new();

        for name in self.store.generations().await? {
            if name.starts_with(&self.settings.cache_prefix) && name != current {
                self.store.delete_generation(&name).await?;
                tracing::info!(generation = %name, "deleted superseded generation");
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Fetch hook. `None` means the request is not intercepted.
    pub async fn intercept(&self, request: &RequestDescriptor) -> Option<Result<StrategyOutcome, Error>> {
        if self.state().await != LifecycleState::Active {
            return None;
        }

        let decision = self.classifier.read().await.classify(request);
        match decision {
            Decision::Bypass(reason) => {
                tracing::debug!(url = %request.url(), ?reason, "request bypasses cache");
                None
            }
            Decision::Cache(kind) => Some(self.strategies.run(kind, request).await),
        }
    }

    /// Answer a request: through the cache when intercepted, otherwise
    /// straight from the origin with options derived from the serving origin.
    pub async fn respond(&self, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        if let Some(outcome) = self.intercept(request).await {
            return outcome;
        }
        let options = FetchOptions::for_request(request, &self.settings.origin);
        let response = self.fetcher.fetch(request, &options).await?;
        Ok(StrategyOutcome::passthrough(response))
    }

    pub async fn handle_message(&self, command: ControlCommand) -> Result<ControlReply, Error> {
        match command {
            ControlCommand::ClearCache => {
                self.generation().destroy().await?;
                tracing::info!(generation = self.generation().name(), "cache cleared");
                Ok(ControlReply::new(control::STATUS_CACHE_CLEARED))
            }
            ControlCommand::RevalidateAll => {
                let marked = self.metadata().mark_all_stale().await?;
                tracing::info!(marked, "all assets marked for revalidation");
                Ok(ControlReply::new(control::STATUS_REVALIDATION_SCHEDULED))
            }
        }
    }

    /// Handle a raw posted message. Unknown messages are ignored and get no
    /// reply.
    pub async fn post_message(&self, message: &serde_json::Value) -> Result<Option<ControlReply>, Error> {
        match ControlCommand::parse(message) {
            Some(command) => self.handle_message(command).await.map(Some),
            None => {
                tracing::debug!(%message, "ignoring unknown control message");
                Ok(None)
            }
        }
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        Ok(WorkerStatus {
            state: self.state().await,
            generation: self.generation().name().to_string(),
            tracked_urls: self.metadata().get().await?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::cache::CacheDb;
    use crate::classify::{CachePolicy, DomainSet, StrategyKind};
    use crate::fetch::RequestMode;
    use crate::metadata::DEFAULT_MAX_AGE_MS;
    use crate::strategy::ResponseSource;
    use crate::testing::{FakeFetcher, ManualClock};

    const NOW: i64 = 1_700_000_000_000;
    const ORIGIN: &str = "https://ccported.test";
    const INDEX: &str = "https://ccported.test/index.html";
    const SERVERS: &str = "https://ccported.test/servers.txt";

    struct Fixture {
        worker: CacheWorker,
        db: Arc<CacheDb>,
        fetcher: FakeFetcher,
        clock: ManualClock,
    }

    async fn fixture(policy: CachePolicy) -> Fixture {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let fetcher = FakeFetcher::default();
        let clock = ManualClock::new(NOW);
        let origin = Url::parse(ORIGIN).unwrap();

        let classifier = Classifier::new(
            origin.clone(),
            policy,
            DomainSet::new(["ccgstatic.com"]),
            DomainSet::new(["www.google-analytics.com", "amazonaws.com"]),
        );
        let settings = WorkerSettings {
            cache_prefix: "ccported-cache-".into(),
            cache_version: "v2".into(),
            origin,
            precache: vec![Url::parse(INDEX).unwrap()],
            domain_list: Some(Url::parse(SERVERS).unwrap()),
            max_age_ms: DEFAULT_MAX_AGE_MS,
        };
        let worker = CacheWorker::new(
            db.clone(),
            Arc::new(fetcher.clone()),
            classifier,
            settings,
            Arc::new(clock.clone()),
        );
        Fixture { worker, db, fetcher, clock }
    }

    async fn active(policy: CachePolicy) -> Fixture {
        let f = fixture(policy).await;
        f.fetcher.respond(INDEX, 200, "<html>home</html>");
        f.fetcher.respond(SERVERS, 200, "");
        f.worker.install().await.unwrap();
        f.worker.activate().await.unwrap();
        f
    }

    fn get(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(url).unwrap()
    }

    #[test]
    fn test_settings_names() {
        let settings = WorkerSettings {
            cache_prefix: "ccported-cache-".into(),
            cache_version: "v1".into(),
            origin: Url::parse(ORIGIN).unwrap(),
            precache: vec![],
            domain_list: None,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        };
        assert_eq!(settings.generation_name(), "ccported-cache-v1");
        assert_eq!(settings.metadata_key(), "ccported-cache-metadata");
    }

    #[tokio::test]
    async fn test_install_precaches_and_stamps() {
        let f = fixture(CachePolicy::site()).await;
        f.fetcher.respond(INDEX, 200, "<html>home</html>");
        f.fetcher.fail(SERVERS);

        f.worker.install().await.unwrap();

        assert_eq!(f.worker.state().await, LifecycleState::Installed);
        let cached = f.worker.generation().lookup(&get(INDEX).cache_key()).await.unwrap().unwrap();
        assert_eq!(cached.body, Bytes::from("<html>home</html>"));
        assert_eq!(f.worker.metadata().timestamp(INDEX).await.unwrap(), Some(NOW));
    }

    #[tokio::test]
    async fn test_install_extends_allow_list() {
        let f = fixture(CachePolicy::site()).await;
        f.fetcher.respond(INDEX, 200, "home");
        f.fetcher.respond(SERVERS, 200, "games.example.net,East\n\n  cdn.other.org , West\n");

        f.worker.install().await.unwrap();

        let classifier = f.worker.classifier().await;
        assert!(classifier.allowed().matches("games.example.net"));
        assert!(classifier.allowed().matches("cdn.other.org"));
        assert!(classifier.allowed().matches("ccgstatic.com"));
    }

    #[tokio::test]
    async fn test_precache_failure_makes_worker_redundant() {
        let f = fixture(CachePolicy::site()).await;
        f.fetcher.respond(INDEX, 404, "missing");

        let result = f.worker.install().await;

        assert!(matches!(result, Err(Error::Lifecycle(_))));
        assert_eq!(f.worker.state().await, LifecycleState::Redundant);
        assert!(f.worker.activate().await.is_err());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let f = fixture(CachePolicy::site()).await;
        assert!(matches!(f.worker.activate().await, Err(Error::Lifecycle(_))));
        assert_eq!(f.worker.state().await, LifecycleState::Installing);
    }

    #[tokio::test]
    async fn test_activate_deletes_superseded_generations() {
        let f = fixture(CachePolicy::site()).await;
        f.db.create_generation("ccported-cache-v1").await.unwrap();
        f.db.create_generation("ccported-cache-v0").await.unwrap();
        f.db.create_generation("unrelated-cache").await.unwrap();
        f.fetcher.respond(INDEX, 200, "home");

        f.worker.install().await.unwrap();
        let mut removed = f.worker.activate().await.unwrap();
        removed.sort();

        assert_eq!(removed, vec!["ccported-cache-v0".to_string(), "ccported-cache-v1".to_string()]);
        let mut left = f.db.generations().await.unwrap();
        left.sort();
        assert_eq!(left, vec!["ccported-cache-v2".to_string(), "unrelated-cache".to_string()]);
        assert_eq!(f.worker.state().await, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_requests_pass_through_before_activation() {
        let f = fixture(CachePolicy::site()).await;
        let url = "https://ccported.test/app.js";
        f.fetcher.respond(url, 200, "js");

        assert!(f.worker.intercept(&get(url)).await.is_none());
        let outcome = f.worker.respond(&get(url)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Passthrough);
        let expected = FetchOptions::for_request(&get(url), &Url::parse(ORIGIN).unwrap());
        assert_eq!(f.fetcher.last_options(), Some(expected));
        assert!(f.worker.generation().lookup(&get(url).cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cross_origin_passthrough_withholds_credentials() {
        let f = active(CachePolicy::site()).await;
        let url = "https://www.google-analytics.com/collect.js";
        f.fetcher.respond(url, 200, "js");

        let request = get(url).with_header("Authorization", "Bearer secret");
        let outcome = f.worker.respond(&request).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Passthrough);
        let options = f.fetcher.last_options().unwrap();
        assert_eq!(options.mode, RequestMode::Cors);
        assert!(!options.sends_credentials(request.url()));
    }

    #[tokio::test]
    async fn test_bypassed_request_is_not_cached() {
        let f = active(CachePolicy::site()).await;
        let url = "https://ccported.test/api/score";
        f.fetcher.respond(url, 200, "ok");

        let request = RequestDescriptor::new("POST", url).unwrap();
        let outcome = f.worker.respond(&request).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Passthrough);
        assert!(f.worker.generation().lookup(&request.cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_game_level_asset_scenario() {
        let f = active(CachePolicy::game()).await;
        let url = "https://ccported.test/game_assets/level1.png";
        let request = get(url);
        let strategy = f.worker.classifier().await.classify(&request).strategy();
        assert_eq!(strategy, Some(StrategyKind::TimeAwareCacheFirst));

        f.fetcher.respond(url, 200, "png v1");
        let first = f.worker.respond(&request).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);

        f.clock.advance(3 * 24 * 60 * 60 * 1000);
        let second = f.worker.respond(&request).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(f.fetcher.calls_for(url), 1);

        f.fetcher.respond(url, 200, "png v2");
        f.clock.advance(5 * 24 * 60 * 60 * 1000);
        let third = f.worker.respond(&request).await.unwrap();
        assert_eq!(third.source, ResponseSource::Network);
        assert_eq!(third.response.body, Bytes::from("png v2"));
        assert_eq!(f.fetcher.calls_for(url), 2);
    }

    #[tokio::test]
    async fn test_manifest_fallback_scenario() {
        let f = active(CachePolicy::site()).await;
        let url = "https://ccported.test/manifest.json";

        f.fetcher.respond(url, 200, "{\"games\":[]}");
        f.worker.respond(&get(url)).await.unwrap();

        f.fetcher.fail(url);
        let outcome = f.worker.respond(&get(url)).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, Bytes::from("{\"games\":[]}"));
    }

    #[tokio::test]
    async fn test_cross_origin_fetch_uses_cors_options() {
        let f = active(CachePolicy::site()).await;
        let url = "https://cdn.ccgstatic.com/thumbs/a.png";
        f.fetcher.respond(url, 200, "img");

        f.worker.respond(&get(url)).await.unwrap();

        let options = f.fetcher.last_options().unwrap();
        assert_eq!(options.mode, crate::fetch::RequestMode::Cors);
        assert!(!options.sends_credentials(&Url::parse(url).unwrap()));
    }

    #[tokio::test]
    async fn test_clear_cache_empties_generation() {
        let f = active(CachePolicy::site()).await;
        let url = "https://ccported.test/app.js";
        f.fetcher.respond(url, 200, "js");
        f.worker.respond(&get(url)).await.unwrap();

        let reply = f.worker.post_message(&json!({"action": "CLEAR_CACHE"})).await.unwrap();

        assert_eq!(reply, Some(ControlReply::new("Cache cleared")));
        for key in [get(url).cache_key(), get(INDEX).cache_key()] {
            assert!(f.worker.generation().lookup(&key).await.unwrap().is_none());
        }
        assert!(f.worker.metadata().get().await.unwrap().is_empty());

        let outcome = f.worker.respond(&get(url)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_revalidate_all_marks_every_url_stale() {
        let f = active(CachePolicy::site()).await;
        let url = "https://ccported.test/styles/main.css";
        f.fetcher.respond(url, 200, "css");
        f.worker.respond(&get(url)).await.unwrap();

        let reply = f.worker.handle_message(ControlCommand::RevalidateAll).await.unwrap();
        assert_eq!(reply.status, "All assets marked for revalidation");

        let metadata = f.worker.metadata();
        for tracked in [url, INDEX] {
            assert_eq!(metadata.timestamp(tracked).await.unwrap(), Some(0));
            assert!(metadata.is_stale(tracked, DEFAULT_MAX_AGE_MS).await.unwrap());
        }

        let outcome = f.worker.respond(&get(url)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(f.fetcher.calls_for(url), 2);
    }

    #[tokio::test]
    async fn test_unknown_message_gets_no_reply() {
        let f = active(CachePolicy::site()).await;
        let reply = f.worker.post_message(&json!({"action": "REBOOT"})).await.unwrap();
        assert_eq!(reply, None);
        assert_eq!(f.worker.status().await.unwrap().tracked_urls, 1);
    }

    #[tokio::test]
    async fn test_status() {
        let f = active(CachePolicy::site()).await;
        let status = f.worker.status().await.unwrap();
        assert_eq!(status.state, LifecycleState::Active);
        assert_eq!(status.generation, "ccported-cache-v2");
        assert_eq!(status.tracked_urls, 1);
    }
}
