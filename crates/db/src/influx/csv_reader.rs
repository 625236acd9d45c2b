use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracker_core::Dimension;

use crate::error::{Result, StoreError};
use crate::types::Record;

#[derive(Debug, Default)]
struct Columns {
    time: Option<usize>,
    field: Option<usize>,
    value: Option<usize>,
    error: Option<usize>,
    tags: Vec<(Dimension, usize)>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Self {
        let mut columns = Columns::default();
        for (index, name) in header.iter().enumerate() {
            match name {
                "_time" => columns.time = Some(index),
                "_field" => columns.field = Some(index),
                "_value" => columns.value = Some(index),
                "error" => columns.error = Some(index),
                other => {
                    if let Some(dimension) = Dimension::ALL.iter().find(|d| d.tag() == other) {
                        columns.tags.push((*dimension, index));
                    }
                }
            }
        }
        columns
    }
}

fn is_header(row: &StringRecord) -> bool {
    row.get(1) == Some("result") || row.get(0) == Some("error")
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

fn cell<'a>(row: &'a StringRecord, index: Option<usize>) -> Option<&'a str> {
    index
        .and_then(|index| row.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parses an annotated-CSV query response into long-format records.
///
/// Each table starts with its own header row, so the column layout is
/// re-read whenever one appears. An `error` column signals a failure the
/// server reported after the status line was sent.
pub fn parse_records(body: &str) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut columns: Option<Columns> = None;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if is_blank(&row) || row.get(0).is_some_and(|first| first.starts_with('#')) {
            continue;
        }
        if is_header(&row) {
            columns = Some(Columns::from_header(&row));
            continue;
        }
        let Some(layout) = columns.as_ref() else {
            return Err(StoreError::InvalidResponse(
                "data row before header".to_string(),
            ));
        };
        if let Some(message) = cell(&row, layout.error) {
            return Err(StoreError::Api {
                status: 200,
                message: message.to_string(),
            });
        }

        let mut record = Record {
            time: cell(&row, layout.time)
                .map(|value| DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc)))
                .transpose()?,
            field: cell(&row, layout.field).map(str::to_string),
            value: cell(&row, layout.value)
                .map(|value| {
                    value.parse::<f64>().map_err(|err| {
                        StoreError::InvalidResponse(format!("bad _value {value:?}: {err}"))
                    })
                })
                .transpose()?,
            ..Record::default()
        };
        for (dimension, index) in &layout.tags {
            if let Some(value) = cell(&row, Some(*index)) {
                record.set_tag(*dimension, value.to_string());
            }
        }
        records.push(record);
    }
    Ok(records)
}
