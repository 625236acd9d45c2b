use std::sync::LazyLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use tracker_db::{QueryWindow, WindowPeriod};

use crate::config::RangeParams;
use crate::error::{AppError, Result};

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)([mhd])$").expect("range pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeUnit {
    Minutes,
    Hours,
    Days,
}

impl RangeUnit {
    fn suffix(self) -> char {
        match self {
            RangeUnit::Minutes => 'm',
            RangeUnit::Hours => 'h',
            RangeUnit::Days => 'd',
        }
    }

    fn seconds(self) -> i64 {
        match self {
            RangeUnit::Minutes => 60,
            RangeUnit::Hours => 3600,
            RangeUnit::Days => 86_400,
        }
    }
}

/// A relative lookback such as `3h` or `30d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub amount: u32,
    pub unit: RangeUnit,
}

/// Longest accepted lookback; larger amounts fall back like malformed input.
const MAX_RANGE_SECONDS: i64 = 100 * 365 * 86_400;

impl Default for RangeSpec {
    fn default() -> Self {
        Self {
            amount: 3,
            unit: RangeUnit::Hours,
        }
    }
}

impl RangeSpec {
    pub fn duration(&self) -> Duration {
        Duration::seconds(i64::from(self.amount) * self.unit.seconds())
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.amount, self.unit.suffix())
    }
}

/// Parses `<digits><m|h|d>`; anything else yields the 3 hour default.
pub fn parse_range(value: &str) -> RangeSpec {
    let Some(captures) = RANGE_PATTERN.captures(value.trim()) else {
        return RangeSpec::default();
    };
    let Ok(amount) = captures[1].parse::<u32>() else {
        return RangeSpec::default();
    };
    let unit = match &captures[2] {
        "m" => RangeUnit::Minutes,
        "h" => RangeUnit::Hours,
        _ => RangeUnit::Days,
    };
    let spec = RangeSpec { amount, unit };
    if amount == 0 || spec.duration().num_seconds() > MAX_RANGE_SECONDS {
        return RangeSpec::default();
    }
    spec
}

/// Timeline bucket width for a range.
///
/// Known ranges map to widths that keep the chart near a hundred or so
/// points; anything else uses three minutes.
pub fn window_period(range: &RangeSpec) -> WindowPeriod {
    match range.label().as_str() {
        "5m" => WindowPeriod::from_secs(10),
        "30m" => WindowPeriod::from_secs(30),
        "1h" => WindowPeriod::minutes(1),
        "3h" => WindowPeriod::minutes(3),
        "6h" => WindowPeriod::minutes(5),
        "12h" => WindowPeriod::minutes(10),
        "24h" => WindowPeriod::minutes(15),
        "7d" => WindowPeriod::hours(1),
        "30d" => WindowPeriod::hours(4),
        "90d" | "365d" => WindowPeriod::days(1),
        _ => WindowPeriod::minutes(3),
    }
}

/// Upper bound on timeline rows for one request.
pub const MAX_TIMELINE_BUCKETS: i64 = 10_000;

const DAY_SECONDS: i64 = 86_400;

/// Known ranges, shortest first, with their bucket widths.
const PERIOD_LADDER: [(i64, WindowPeriod); 11] = [
    (5 * 60, WindowPeriod::from_secs(10)),
    (30 * 60, WindowPeriod::from_secs(30)),
    (3_600, WindowPeriod::minutes(1)),
    (3 * 3_600, WindowPeriod::minutes(3)),
    (6 * 3_600, WindowPeriod::minutes(5)),
    (12 * 3_600, WindowPeriod::minutes(10)),
    (DAY_SECONDS, WindowPeriod::minutes(15)),
    (7 * DAY_SECONDS, WindowPeriod::hours(1)),
    (30 * DAY_SECONDS, WindowPeriod::hours(4)),
    (90 * DAY_SECONDS, WindowPeriod::days(1)),
    (365 * DAY_SECONDS, WindowPeriod::days(1)),
];

/// Bucket width for a window of arbitrary length: the width of the shortest
/// known range covering it, or whole days keeping it within a year's worth
/// of buckets.
pub fn period_for_span(span: Duration) -> WindowPeriod {
    let seconds = span.num_seconds().max(1);
    if let Some((_, period)) = PERIOD_LADDER.iter().find(|(covers, _)| seconds <= *covers) {
        return *period;
    }
    let year = 365 * DAY_SECONDS;
    WindowPeriod::days((seconds + year - 1) / year)
}

fn bucket_count(window: QueryWindow, every: WindowPeriod) -> i64 {
    let span = (window.stop - every.align(window.start)).num_seconds();
    (span + every.seconds() - 1) / every.seconds()
}

/// Bucket width for the timeline window of a request.
///
/// The range table applies while the timeline covers the range itself.
/// Explicit dates, or a range too long for its table width, size the
/// buckets from the window instead.
pub fn timeline_period(range: &RangeSpec, window: QueryWindow) -> WindowPeriod {
    let every = window_period(range);
    let covers_range = window.duration() == range.duration();
    if covers_range && bucket_count(window, every) <= MAX_TIMELINE_BUCKETS {
        return every;
    }
    period_for_span(window.duration())
}

/// Current window `[now - d, now)` and the equal-length window before it.
pub fn resolve_windows(range: &RangeSpec, now: DateTime<Utc>) -> (QueryWindow, QueryWindow) {
    let current = QueryWindow::ending_at(now, range.duration());
    (current, current.preceding())
}

/// Applies `startDate`/`endDate` to the timeline window.
pub fn resolve_timeline_window(params: &RangeParams, current: QueryWindow) -> Result<QueryWindow> {
    let start = match non_empty(params.start_date.as_deref()) {
        Some(value) => parse_datetime("startDate", value)?,
        None => current.start,
    };
    let stop = match non_empty(params.end_date.as_deref()) {
        Some(value) => parse_datetime("endDate", value)?,
        None => current.stop,
    };
    if start >= stop {
        return Err(AppError::InvalidInput(format!(
            "startDate must be before endDate ({} >= {})",
            format_utc(start),
            format_utc(stop)
        )));
    }
    Ok(QueryWindow::new(start, stop))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn parse_datetime(name: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| AppError::InvalidInput(format!("invalid {}: {}", name, err)))
}

pub fn format_utc(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn parses_valid_ranges() {
        assert_eq!(parse_range("24h").duration(), Duration::hours(24));
        assert_eq!(parse_range("5m").duration(), Duration::minutes(5));
        assert_eq!(parse_range("30d").duration(), Duration::days(30));
        assert_eq!(parse_range("7d").label(), "7d");
    }

    #[test]
    fn malformed_ranges_fall_back_to_three_hours() {
        for value in ["", "abc", "0h", "3w", "h3", "-1h", "1.5h", "99999999999d", "36501d"] {
            assert_eq!(parse_range(value), RangeSpec::default(), "{value}");
        }
        assert_eq!(RangeSpec::default().duration(), Duration::hours(3));
    }

    #[test]
    fn window_period_table() {
        let cases = [
            ("5m", "10s"),
            ("30m", "30s"),
            ("1h", "1m"),
            ("3h", "3m"),
            ("6h", "5m"),
            ("12h", "10m"),
            ("24h", "15m"),
            ("7d", "1h"),
            ("30d", "4h"),
            ("90d", "1d"),
            ("365d", "1d"),
            ("2h", "3m"),
        ];
        for (range, every) in cases {
            assert_eq!(window_period(&parse_range(range)).literal(), every, "{range}");
        }
    }

    #[test]
    fn previous_window_abuts_current() {
        let now = at("2025-03-01T12:00:00Z");
        let (current, previous) = resolve_windows(&parse_range("24h"), now);
        assert_eq!(current.start, at("2025-02-28T12:00:00Z"));
        assert_eq!(current.stop, now);
        assert_eq!(previous.stop, current.start);
        assert_eq!(previous.start, at("2025-02-27T12:00:00Z"));
        assert_eq!(previous.duration(), current.duration());
    }

    #[test]
    fn timeline_dates_override_either_side() {
        let (current, _) = resolve_windows(&parse_range("3h"), at("2025-03-01T12:00:00Z"));
        let params = RangeParams {
            start_date: Some("2025-03-01T10:00:00+02:00".to_string()),
            ..RangeParams::default()
        };
        let window = resolve_timeline_window(&params, current).expect("window");
        assert_eq!(window.start, at("2025-03-01T08:00:00Z"));
        assert_eq!(window.stop, current.stop);

        let unchanged = resolve_timeline_window(&RangeParams::default(), current).expect("window");
        assert_eq!(unchanged, current);
    }

    #[test]
    fn invalid_timeline_dates_are_rejected() {
        let (current, _) = resolve_windows(&parse_range("3h"), at("2025-03-01T12:00:00Z"));
        let garbled = RangeParams {
            end_date: Some("yesterday".to_string()),
            ..RangeParams::default()
        };
        assert!(matches!(
            resolve_timeline_window(&garbled, current),
            Err(AppError::InvalidInput(_))
        ));

        let inverted = RangeParams {
            start_date: Some("2025-03-02T00:00:00Z".to_string()),
            end_date: Some("2025-03-01T00:00:00Z".to_string()),
            ..RangeParams::default()
        };
        assert!(matches!(
            resolve_timeline_window(&inverted, current),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn explicit_dates_size_buckets_from_the_window() {
        let range = parse_range("3h");
        let now = at("2025-03-01T12:00:00Z");
        let (current, _) = resolve_windows(&range, now);
        assert_eq!(timeline_period(&range, current).literal(), "3m");

        let month = QueryWindow::new(at("2025-02-01T00:00:00Z"), now);
        let every = timeline_period(&range, month);
        assert_eq!(every.literal(), "4h");
        assert!(bucket_count(month, every) <= 200);

        let hour = QueryWindow::new(at("2025-03-01T11:10:00Z"), now);
        assert_eq!(timeline_period(&range, hour).literal(), "1m");
    }

    #[test]
    fn long_spans_stay_bounded() {
        let now = at("2025-03-01T12:00:00Z");
        let decade = QueryWindow::ending_at(now, Duration::days(3_650));
        let every = period_for_span(decade.duration());
        assert_eq!(every.literal(), "10d");
        assert!(bucket_count(decade, every) <= 366);

        let range = parse_range("200d");
        let (current, _) = resolve_windows(&range, now);
        let every = timeline_period(&range, current);
        assert_eq!(every.literal(), "1d");
        assert!(bucket_count(current, every) <= MAX_TIMELINE_BUCKETS);
    }
}
