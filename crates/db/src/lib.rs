pub mod error;
pub mod influx;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use influx::InfluxStore;
pub use sqlite::{Db, SqliteStore};
pub use store::TimeSeriesStore;
pub use types::{
    AggregationQuery, InfluxConnection, QueryShape, QueryWindow, Record, TagFilters, UsagePoint,
    WindowPeriod, format_time,
};
