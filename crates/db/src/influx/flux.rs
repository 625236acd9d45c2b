use tracker_core::MEASUREMENT;

use crate::types::{AggregationQuery, QueryShape, TagFilters, format_time};

/// Escapes a value for use inside a Flux string literal.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Renders the conjunctive tag filter, or `None` when no tag is constrained.
pub fn tag_filter(filters: &TagFilters) -> Option<String> {
    let predicates = filters.predicates();
    if predicates.is_empty() {
        return None;
    }
    let clauses = predicates
        .iter()
        .map(|(dimension, value)| {
            format!(r#"r["{}"] == "{}""#, dimension.tag(), escape_string(value))
        })
        .collect::<Vec<_>>()
        .join(" and ");
    Some(format!("|> filter(fn: (r) => {clauses})"))
}

pub fn render(bucket: &str, query: &AggregationQuery) -> String {
    let mut lines = vec![
        format!(r#"from(bucket: "{}")"#, escape_string(bucket)),
        format!(
            "|> range(start: {}, stop: {})",
            format_time(query.window.start),
            format_time(query.window.stop)
        ),
        format!(r#"|> filter(fn: (r) => r["_measurement"] == "{MEASUREMENT}")"#),
    ];
    if let Some(filter) = tag_filter(&query.filters) {
        lines.push(filter);
    }
    let fields = query
        .fields()
        .iter()
        .map(|field| format!(r#"r["_field"] == "{}""#, field.as_str()))
        .collect::<Vec<_>>()
        .join(" or ");
    lines.push(format!("|> filter(fn: (r) => {fields})"));

    match query.shape {
        QueryShape::Summary => {
            lines.push(r#"|> group(columns: ["_field"])"#.to_string());
            lines.push("|> sum()".to_string());
        }
        QueryShape::Breakdown(dimension) => {
            lines.push(format!(r#"|> group(columns: ["{}"])"#, dimension.tag()));
            lines.push("|> sum()".to_string());
            lines.push("|> group()".to_string());
            lines.push(r#"|> sort(columns: ["_value"], desc: true)"#.to_string());
        }
        QueryShape::Timeline { every } => {
            lines.push(r#"|> group(columns: ["_field"])"#.to_string());
            lines.push(format!(
                r#"|> aggregateWindow(every: {}, fn: sum, createEmpty: true, timeSrc: "_start")"#,
                every.literal()
            ));
        }
    }
    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use tracker_core::Dimension;

    use super::*;
    use crate::types::{QueryWindow, WindowPeriod};

    fn window() -> QueryWindow {
        let stop = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        QueryWindow::ending_at(stop, Duration::hours(3))
    }

    #[test]
    fn escapes_quotes_backslashes_and_interpolation() {
        assert_eq!(escape_string(r#"a"b\c${x}"#), r#"a\"b\\c\${x}"#);
    }

    #[test]
    fn no_filter_fragment_without_tags() {
        assert_eq!(tag_filter(&TagFilters::default()), None);
    }

    #[test]
    fn tag_filter_is_conjunctive() {
        let filters = TagFilters {
            agent: Some("coder".to_string()),
            model: None,
            project: Some("web \"app\"".to_string()),
        };
        assert_eq!(
            tag_filter(&filters).as_deref(),
            Some(r#"|> filter(fn: (r) => r["agent"] == "coder" and r["project"] == "web \"app\"")"#)
        );
    }

    #[test]
    fn summary_groups_by_field() {
        let flux = render("token-usage", &AggregationQuery::summary(window(), &TagFilters::default()));
        assert!(flux.starts_with(r#"from(bucket: "token-usage")"#));
        assert!(flux.contains("range(start: 2025-03-01T09:00:00.000Z, stop: 2025-03-01T12:00:00.000Z)"));
        assert!(flux.contains(r#"r["_field"] == "files_changed""#));
        assert!(flux.contains(r#"group(columns: ["_field"])"#));
        assert!(flux.trim_end().ends_with("|> sum()"));
    }

    #[test]
    fn breakdown_reads_total_tokens_sorted_descending() {
        let query = AggregationQuery::breakdown(window(), &TagFilters::default(), Dimension::Model);
        let flux = render("token-usage", &query);
        assert!(flux.contains(r#"|> filter(fn: (r) => r["_field"] == "total_tokens")"#));
        assert!(flux.contains(r#"group(columns: ["model"])"#));
        assert!(flux.contains(r#"sort(columns: ["_value"], desc: true)"#));
    }

    #[test]
    fn timeline_windows_by_period() {
        let query =
            AggregationQuery::timeline(window(), &TagFilters::default(), WindowPeriod::minutes(3));
        let flux = render("token-usage", &query);
        assert!(flux.contains("aggregateWindow(every: 3m, fn: sum, createEmpty: true"));
    }
}
