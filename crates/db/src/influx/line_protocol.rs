use std::fmt::Write as _;

use tracker_core::{Dimension, MEASUREMENT};

use crate::error::{Result, StoreError};
use crate::types::UsagePoint;

const UNKNOWN_TAG: &str = "unknown";

fn escape_key(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            ',' | ' ' | '=' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn tag_value(value: &str) -> String {
    if value.is_empty() {
        return UNKNOWN_TAG.to_string();
    }
    escape_key(value)
}

/// Encodes one point as a line with a nanosecond timestamp.
pub fn encode_point(point: &UsagePoint) -> Result<String> {
    if point.fields.is_empty() {
        return Err(StoreError::InvalidPoint("point has no fields".to_string()));
    }
    let timestamp = point.time.timestamp_nanos_opt().ok_or_else(|| {
        StoreError::InvalidPoint(format!("timestamp out of range: {}", point.time))
    })?;

    let mut line = String::from(MEASUREMENT);
    for dimension in Dimension::ALL {
        let _ = write!(line, ",{}={}", dimension.tag(), tag_value(point.tag(dimension)));
    }
    line.push(' ');
    for (index, (field, value)) in point.fields.iter().enumerate() {
        if !value.is_finite() {
            return Err(StoreError::InvalidPoint(format!(
                "{} is not finite",
                field.as_str()
            )));
        }
        if index > 0 {
            line.push(',');
        }
        let _ = write!(line, "{}={}", field.as_str(), value);
    }
    let _ = write!(line, " {timestamp}");
    Ok(line)
}

pub fn encode_batch(points: &[UsagePoint]) -> Result<String> {
    let lines = points.iter().map(encode_point).collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}
