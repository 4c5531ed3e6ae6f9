use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cache::ResponseCache;
use crate::config::Settings;
use crate::dataset::generator::GeneratorConfig;
use crate::dataset::store::DatasetStore;
use crate::dispatch::Dispatcher;
use crate::utils::Limiters;

/// Everything the handlers share. Built once at startup.
pub struct AppState {
    pub settings: Settings,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn build(settings: Settings) -> Result<Arc<Self>> {
        let generator = GeneratorConfig {
            seed: settings.dataset.seed,
            tickets: settings.dataset.tickets,
            customers: settings.dataset.customers,
            span_days: settings.dataset.span_days,
        };
        let store = Arc::new(DatasetStore::load(settings.dataset_path(), generator)?);
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(
            settings.cache.ttl_seconds,
        )));
        let limiters = Limiters::new(&settings.limits);
        let dispatcher = Dispatcher::new(
            store,
            cache,
            limiters,
            Duration::from_millis(settings.server.slow_threshold_ms),
        );
        Ok(Arc::new(Self {
            settings,
            dispatcher,
        }))
    }
}
