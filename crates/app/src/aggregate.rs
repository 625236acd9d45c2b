//! Turns long-format store rows into the response shapes.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracker_core::{Breakdown, Dimension, MetricField, TimelineRow, TokenSummary};
use tracker_db::{QueryWindow, Record, WindowPeriod};

use crate::util::time::format_utc;

/// Sums rows into a summary. Unknown fields are dropped and nulls count as 0.
pub fn summary_from_records(records: &[Record]) -> TokenSummary {
    let mut summary = TokenSummary::default();
    for record in records {
        let Some(field) = record.metric_field() else {
            continue;
        };
        let value = record.value.unwrap_or(0.0);
        summary.set(field, summary.get(field) + value);
    }
    summary
}

/// One entry per value of `dimension`, largest first.
pub fn breakdown_from_records(records: &[Record], dimension: Dimension) -> Vec<Breakdown> {
    let mut entries: Vec<Breakdown> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let Some(name) = record.tag(dimension) else {
            continue;
        };
        let value = record.value.unwrap_or(0.0);
        match index.get(name) {
            Some(position) => entries[*position].value += value,
            None => {
                index.insert(name.to_string(), entries.len());
                entries.push(Breakdown {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries
}

/// A timeline bucket before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBucket {
    pub time: DateTime<Utc>,
    pub values: BTreeMap<MetricField, f64>,
}

/// Pivots `(time, field, value)` rows into one bucket per time.
#[derive(Debug, Clone)]
pub struct TimelineMerger {
    every: WindowPeriod,
    index: HashMap<DateTime<Utc>, usize>,
    buckets: Vec<TimelineBucket>,
}

impl TimelineMerger {
    pub fn new(every: WindowPeriod) -> Self {
        Self {
            every,
            index: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Folds one row in; rows without a time or a known field are skipped.
    pub fn push(&mut self, record: &Record) {
        let (Some(time), Some(field)) = (record.time, record.metric_field()) else {
            return;
        };
        let time = self.every.align(time);
        let position = match self.index.get(&time) {
            Some(position) => *position,
            None => {
                self.index.insert(time, self.buckets.len());
                self.buckets.push(TimelineBucket {
                    time,
                    values: BTreeMap::new(),
                });
                self.buckets.len() - 1
            }
        };
        *self.buckets[position].values.entry(field).or_insert(0.0) += record.value.unwrap_or(0.0);
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        for record in records {
            self.push(record);
        }
    }

    /// Buckets in order of first appearance.
    pub fn into_buckets(self) -> Vec<TimelineBucket> {
        self.buckets
    }
}

/// Emits a row for every bucket boundary in `window`, ascending, with every
/// field present.
pub fn fill_timeline(
    buckets: Vec<TimelineBucket>,
    window: QueryWindow,
    every: WindowPeriod,
) -> Vec<TimelineRow> {
    let mut by_time: BTreeMap<DateTime<Utc>, BTreeMap<MetricField, f64>> = buckets
        .into_iter()
        .map(|bucket| (bucket.time, bucket.values))
        .collect();

    let mut boundary = every.align(window.start);
    while boundary < window.stop {
        by_time.entry(boundary).or_default();
        boundary += every.duration();
    }

    by_time
        .into_iter()
        .map(|(time, values)| {
            let mut row = TimelineRow::new(format_utc(time));
            for field in MetricField::ALL {
                let value = values.get(&field).copied().unwrap_or(0.0);
                row.values.insert(field.as_str().to_string(), value);
            }
            row
        })
        .collect()
}
