use super::{Strategies, StrategyOutcome};
use crate::Error;
use crate::classify::RequestDescriptor;

impl Strategies {
    /// Time-aware cache-first: serve the cached copy while it is younger than
    /// the max age, otherwise refresh from the origin.
    ///
    /// A cached copy without a timestamp counts as stale. If the refresh fails
    /// outright the stale copy is still served.
    pub async fn time_aware_cache_first(&self, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        let cached = self.lookup(request).await;

        if let Some(cached) = &cached
            && !self.is_stale(request).await
        {
            return Ok(StrategyOutcome::cache(cached.clone()));
        }

        match self.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(request, &response, true).await;
                }
                Ok(StrategyOutcome::network(response))
            }
            Err(e) => match cached {
                Some(stale) => {
                    tracing::debug!(url = %request.url(), error = %e, "refresh failed, serving stale copy");
                    Ok(StrategyOutcome::cache(stale))
                }
                None => Err(e),
            },
        }
    }
}
