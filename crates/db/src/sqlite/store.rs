use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;

use super::Db;
use crate::error::Result;
use crate::store::TimeSeriesStore;
use crate::types::{AggregationQuery, Record, UsagePoint};

/// [`TimeSeriesStore`] over a local SQLite file.
///
/// Every operation opens its own connection on a blocking thread, so
/// concurrent queries from one request run side by side under WAL.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens the file, creating it and applying migrations when needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut db = Db::open(&path)?;
        db.migrate()?;
        Ok(Self { path })
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Db) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut db = Db::open(&path)?;
            f(&mut db)
        })
        .await?
    }
}

#[async_trait]
impl TimeSeriesStore for SqliteStore {
    async fn write_points(&self, points: &[UsagePoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let points = points.to_vec();
        let inserted = self.with_db(move |db| db.insert_points(&points)).await?;
        tracing::debug!(rows = inserted, "sqlite write committed");
        Ok(())
    }

    async fn query(&self, query: &AggregationQuery) -> Result<Vec<Record>> {
        let started = Instant::now();
        let owned = query.clone();
        let records = self.with_db(move |db| db.aggregate(&owned)).await?;
        tracing::debug!(
            shape = ?query.shape,
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sqlite query complete"
        );
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        self.with_db(|db| db.ping()).await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

impl Db {
    pub fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
