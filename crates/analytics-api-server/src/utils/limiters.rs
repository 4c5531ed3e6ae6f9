use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::settings::LimitsConfig;

/// Bounds concurrent resolver execution and the time a request may spend
/// waiting for a slot, so a pathological filter cannot stall the dispatcher.
#[derive(Clone)]
pub struct Limiters {
    pub query: Arc<Semaphore>,
    pub acquire_timeout: Duration,
    pub resolver_budget: Duration,
}

impl Limiters {
    pub fn new(cfg: &LimitsConfig) -> Self {
        Self {
            query: Arc::new(Semaphore::new(cfg.query_concurrency.max(1))),
            acquire_timeout: Duration::from_millis(cfg.acquire_timeout_ms.max(1)),
            resolver_budget: Duration::from_millis(cfg.resolver_budget_ms.max(1)),
        }
    }

    pub async fn acquire_query(&self) -> Result<(OwnedSemaphorePermit, Duration)> {
        let start = Instant::now();
        let permit = tokio::time::timeout(self.acquire_timeout, self.query.clone().acquire_owned())
            .await
            .map_err(|_| anyhow::anyhow!("query limiter acquire timeout"))??;
        Ok((permit, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_config() -> LimitsConfig {
        LimitsConfig {
            query_concurrency: 1,
            acquire_timeout_ms: 20,
            resolver_budget_ms: 1000,
        }
    }

    #[tokio::test]
    async fn acquire_times_out_when_saturated() {
        let limiters = Limiters::new(&tight_config());
        let (_held, _) = limiters.acquire_query().await.unwrap();
        assert!(limiters.acquire_query().await.is_err());
    }

    #[tokio::test]
    async fn permit_release_unblocks_the_next_request() {
        let limiters = Limiters::new(&tight_config());
        let (held, _) = limiters.acquire_query().await.unwrap();
        drop(held);
        assert!(limiters.acquire_query().await.is_ok());
    }
}
