use super::{Strategies, StrategyOutcome};
use crate::Error;
use crate::classify::RequestDescriptor;

impl Strategies {
    /// Cache-first: any cached copy is served without touching the origin.
    ///
    /// On a miss the origin is fetched and a 2xx answer is cached. Freshness
    /// metadata is left alone; cache-first entries never expire.
    pub async fn cache_first(&self, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        if let Some(cached) = self.lookup(request).await {
            return Ok(StrategyOutcome::cache(cached));
        }

        let response = self.fetch(request).await?;
        if response.is_ok() {
            self.store(request, &response, false).await;
        }
        Ok(StrategyOutcome::network(response))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::Error;
    use crate::classify::RequestDescriptor;
    use crate::strategy::ResponseSource;
    use crate::strategy::harness::Harness;

    const URL: &str = "https://ccported.test/game_data/level.js";

    #[tokio::test]
    async fn test_hit_skips_network() {
        let h = Harness::new().await;
        h.seed(URL, "cached level", false).await;
        h.fetcher.respond(URL, 200, "fresh level");

        let outcome = h.strategies.cache_first(&RequestDescriptor::get(URL).unwrap()).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, Bytes::from("cached level"));
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let h = Harness::new().await;
        h.fetcher.respond(URL, 200, "fresh level");

        let request = RequestDescriptor::get(URL).unwrap();
        let first = h.strategies.cache_first(&request).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(h.cached(URL).await.unwrap().body, Bytes::from("fresh level"));

        let second = h.strategies.cache_first(&request).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(h.strategies.metadata().timestamp(URL).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_ok_returned_but_not_cached() {
        let h = Harness::new().await;
        h.fetcher.respond(URL, 404, "nope");

        let outcome = h.strategies.cache_first(&RequestDescriptor::get(URL).unwrap()).await.unwrap();
        assert_eq!(outcome.response.status, 404);
        assert!(h.cached(URL).await.is_none());
    }

    #[tokio::test]
    async fn test_miss_with_failure_propagates() {
        let h = Harness::new().await;
        h.fetcher.fail(URL);

        let result = h.strategies.cache_first(&RequestDescriptor::get(URL).unwrap()).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
