use rusqlite::params;
use tracker_core::MEASUREMENT;

use super::Db;
use crate::error::{Result, StoreError};
use crate::types::UsagePoint;

impl Db {
    /// Inserts every field of every point in one transaction.
    pub fn insert_points(&mut self, points: &[UsagePoint]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO point_field (measurement, ts_ms, agent, model, project, field, value)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for point in points {
                let ts_ms = point.time.timestamp_millis();
                for (field, value) in &point.fields {
                    if !value.is_finite() {
                        return Err(StoreError::InvalidPoint(format!(
                            "{} is not finite",
                            field.as_str()
                        )));
                    }
                    inserted += stmt.execute(params![
                        MEASUREMENT,
                        ts_ms,
                        tag_or_unknown(&point.agent),
                        tag_or_unknown(&point.model),
                        tag_or_unknown(&point.project),
                        field.as_str(),
                        value,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

fn tag_or_unknown(value: &str) -> &str {
    if value.is_empty() { "unknown" } else { value }
}
