mod ingest;
mod metrics;

use std::sync::Arc;

use tracker_db::TimeSeriesStore;

pub use ingest::IngestService;
pub use metrics::MetricsService;

pub type SharedStore = Arc<dyn TimeSeriesStore>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub metrics: MetricsService,
    pub ingest: IngestService,
    store: SharedStore,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            metrics: MetricsService::new(store.clone()),
            ingest: IngestService::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}
