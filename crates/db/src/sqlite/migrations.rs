use rusqlite::OptionalExtension;

use super::Db;
use crate::error::Result;

const MIGRATION_0001: &str = include_str!("../../migrations/0001_init.sql");
const MIGRATION_0002: &str = include_str!("../../migrations/0002_add_tag_indexes.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_add_tag_indexes", MIGRATION_0002),
];

impl Db {
    /// Applies every migration not yet recorded in `schema_migration`.
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migration (
               name TEXT PRIMARY KEY,
               applied_at TEXT NOT NULL
             );",
        )?;
        for (name, sql) in MIGRATIONS {
            let applied = tx
                .query_row(
                    "SELECT 1 FROM schema_migration WHERE name = ?1",
                    [name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if applied {
                continue;
            }
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_migration (name, applied_at) VALUES (?1, datetime('now'))",
                [name],
            )?;
            tracing::debug!(migration = name, "applied migration");
        }
        tx.commit()?;
        Ok(())
    }
}
