use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AggregationQuery, Record, UsagePoint};

/// Seam between the query engine and the datastore holding `token_usage`
/// points.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Writes every point and returns only once the batch is durable.
    async fn write_points(&self, points: &[UsagePoint]) -> Result<()>;

    /// Runs one aggregation and returns its rows in long format.
    async fn query(&self, query: &AggregationQuery) -> Result<Vec<Record>>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
