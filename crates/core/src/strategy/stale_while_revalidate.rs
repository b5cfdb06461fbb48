use tokio::task::JoinHandle;

use super::{Strategies, StrategyOutcome};
use crate::Error;
use crate::classify::RequestDescriptor;

impl Strategies {
    /// Stale-while-revalidate: a cached copy is returned immediately.
    ///
    /// When that copy is stale, one background fetch refreshes the cache and
    /// its timestamp. On a miss the origin is fetched in the foreground.
    pub async fn stale_while_revalidate(&self, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        if let Some(cached) = self.lookup(request).await {
            let mut outcome = StrategyOutcome::cache(cached);
            if self.is_stale(request).await {
                outcome.revalidation = Some(self.spawn_revalidation(request.clone()));
            }
            return Ok(outcome);
        }

        let response = self.fetch(request).await?;
        if response.is_ok() {
            self.store(request, &response, true).await;
        }
        Ok(StrategyOutcome::network(response))
    }

    fn spawn_revalidation(&self, request: RequestDescriptor) -> JoinHandle<()> {
        let strategies = self.clone();
        tokio::spawn(async move {
            match strategies.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    strategies.store(&request, &response, true).await;
                    tracing::debug!(url = %request.url(), "background revalidation complete");
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url(), status = response.status, "background revalidation not ok");
                }
                Err(e) => {
                    tracing::warn!(url = %request.url(), error = %e, "background revalidation failed");
                }
            }
        })
    }
}
