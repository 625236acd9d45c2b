use std::sync::Arc;

use tracker_db::{InfluxConnection, InfluxStore, SqliteStore};

use crate::config::{StoreBackend, TrackerConfig};
use crate::error::Result;
use crate::services::{AppServices, SharedStore};

/// Application state shared by the HTTP server and CLI commands.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TrackerConfig>,
    pub services: AppServices,
}

impl AppState {
    /// Connects the configured backend.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let store = open_store(&config)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: TrackerConfig, store: SharedStore) -> Self {
        Self {
            config: Arc::new(config),
            services: AppServices::new(store),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.services.store().backend_name()
    }

    pub async fn health(&self) -> Result<()> {
        self.services.ingest.ping().await
    }
}

pub fn open_store(config: &TrackerConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.store {
        StoreBackend::Influxdb => {
            let connection = InfluxConnection::from(&config.influxdb);
            tracing::info!(url = %connection.url, bucket = %connection.bucket, "using influxdb store");
            Arc::new(InfluxStore::new(&connection)?)
        }
        StoreBackend::Sqlite => {
            tracing::info!(path = %config.sqlite_path.display(), "using sqlite store");
            Arc::new(SqliteStore::open(&config.sqlite_path)?)
        }
    };
    Ok(store)
}
