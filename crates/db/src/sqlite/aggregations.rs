use chrono::{TimeZone, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracker_core::{Dimension, MEASUREMENT};

use super::Db;
use crate::error::{Result, StoreError};
use crate::types::{AggregationQuery, QueryShape, Record, TagFilters};

/// `WHERE` clause shared by every shape, with its bound parameters.
fn conditions(query: &AggregationQuery) -> (String, Vec<Value>) {
    let mut sql = String::from("measurement = ? AND ts_ms >= ? AND ts_ms < ?");
    let mut values = vec![
        Value::Text(MEASUREMENT.to_string()),
        Value::Integer(query.window.start.timestamp_millis()),
        Value::Integer(query.window.stop.timestamp_millis()),
    ];
    push_tag_filters(&query.filters, &mut sql, &mut values);

    let fields = query.fields();
    let placeholders = vec!["?"; fields.len()].join(", ");
    sql.push_str(&format!(" AND field IN ({placeholders})"));
    values.extend(
        fields
            .iter()
            .map(|field| Value::Text(field.as_str().to_string())),
    );
    (sql, values)
}

fn push_tag_filters(filters: &TagFilters, sql: &mut String, values: &mut Vec<Value>) {
    for (dimension, value) in filters.predicates() {
        sql.push_str(&format!(" AND {} = ?", dimension.tag()));
        values.push(Value::Text(value.to_string()));
    }
}

impl Db {
    pub fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<Record>> {
        let (conditions, mut values) = conditions(query);
        match query.shape {
            QueryShape::Summary => {
                let sql = format!(
                    "SELECT field, SUM(value) FROM point_field WHERE {conditions} GROUP BY field ORDER BY field"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                    Ok(Record {
                        field: Some(row.get(0)?),
                        value: row.get(1)?,
                        ..Record::default()
                    })
                })?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            }
            QueryShape::Breakdown(dimension) => {
                let column = dimension.tag();
                let sql = format!(
                    "SELECT {column}, field, SUM(value) AS total FROM point_field WHERE {conditions} \
                     GROUP BY {column} ORDER BY total DESC, {column} ASC"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                    let mut record = Record {
                        field: Some(row.get(1)?),
                        value: row.get(2)?,
                        ..Record::default()
                    };
                    record.set_tag(dimension, row.get(0)?);
                    Ok(record)
                })?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            }
            QueryShape::Timeline { every } => {
                let width_ms = every.seconds() * 1000;
                let sql = format!(
                    "SELECT (ts_ms / ?) * ? AS bucket, field, SUM(value) FROM point_field \
                     WHERE {conditions} GROUP BY bucket, field ORDER BY bucket, field"
                );
                let mut bound = vec![Value::Integer(width_ms), Value::Integer(width_ms)];
                bound.append(&mut values);
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(bound.iter()), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                })?;
                let mut records = Vec::new();
                for row in rows {
                    let (bucket_ms, field, value) = row?;
                    let time = Utc.timestamp_millis_opt(bucket_ms).single().ok_or_else(|| {
                        StoreError::InvalidResponse(format!("bucket out of range: {bucket_ms}"))
                    })?;
                    records.push(Record {
                        time: Some(time),
                        field: Some(field),
                        value,
                        ..Record::default()
                    });
                }
                Ok(records)
            }
        }
    }

    /// Distinct values seen for a tag, for diagnostics and seeding checks.
    pub fn tag_values(&self, dimension: Dimension) -> Result<Vec<String>> {
        let column = dimension.tag();
        let sql = format!("SELECT DISTINCT {column} FROM point_field ORDER BY {column}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
