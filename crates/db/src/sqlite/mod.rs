//! Embedded SQLite backend.
//!
//! Stores one row per point field and performs the same sums the InfluxDB
//! backend delegates to Flux.

mod aggregations;
mod migrations;
mod points;
mod store;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

pub use store::SqliteStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "cache_size", -20_000)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }
}
