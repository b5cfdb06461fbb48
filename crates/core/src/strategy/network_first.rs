use super::{Strategies, StrategyOutcome};
use crate::Error;
use crate::classify::RequestDescriptor;

impl Strategies {
    /// Network-first: the origin wins whenever it answers 2xx.
    ///
    /// A network failure or a non-2xx status falls back to the cached entry.
    /// With nothing cached, the failure is returned.
    pub async fn network_first(&self, request: &RequestDescriptor) -> Result<StrategyOutcome, Error> {
        let failure = match self.fetch(request).await {
            Ok(response) if response.is_ok() => {
                self.store(request, &response, true).await;
                return Ok(StrategyOutcome::network(response));
            }
            Ok(response) => Error::HttpError(response.status),
            Err(e) => e,
        };

        tracing::debug!(url = %request.url(), error = %failure, "network-first fetch failed, trying cache");
        match self.lookup(request).await {
            Some(cached) => Ok(StrategyOutcome::cache(cached)),
            None => Err(failure),
        }
    }
}
