//! Date handling for OLAP requests.
//!
//! The server takes two date flavours: `dateFrom`/`dateTo` query parameters
//! without a fraction, and filter bodies with milliseconds.
//!
//! | Use            | Format                    | Example                   |
//! |----------------|---------------------------|---------------------------|
//! | Query params   | `YYYY-MM-DDTHH:MM:SS`     | `2026-01-05T00:00:00`     |
//! | Filter payload | `YYYY-MM-DDTHH:MM:SS.mmm` | `2026-01-05T00:00:00.000` |
//!
//! Report windows are aligned to Monday 00:00 so a long range can be split
//! into week-sized requests.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};

/// Format of `dateFrom`/`dateTo` query parameters.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format of dates inside filter payloads.
pub const FILTER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Formats a date for the `dateFrom`/`dateTo` query parameters.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use iiko_api::reports::format_query_date;
///
/// let dt = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_milli_opt(9, 30, 0, 250).unwrap();
/// assert_eq!(format_query_date(dt), "2026-01-05T09:30:00");
/// ```
#[must_use]
pub fn format_query_date(dt: NaiveDateTime) -> String {
    dt.format(QUERY_DATE_FORMAT).to_string()
}

/// Formats a date for filter payloads, always with three fraction digits.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use iiko_api::reports::format_filter_date;
///
/// let dt = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// assert_eq!(format_filter_date(dt), "2026-01-05T00:00:00.000");
/// ```
#[must_use]
pub fn format_filter_date(dt: NaiveDateTime) -> String {
    dt.format(FILTER_DATE_FORMAT).to_string()
}

/// Parses a date in any of the forms the server or its users write:
/// `YYYY-MM-DDTHH:MM:SS[.fff]`, the same with a space separator, or a bare
/// `YYYY-MM-DD` (midnight).
///
/// # Errors
///
/// Returns the parse error of the bare date form if no form matches.
pub fn parse_api_date(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    for format in ACCEPTED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
}

/// Returns Monday 00:00 of the week after the one containing `dt`.
///
/// The result is always strictly after `dt`, including when `dt` is
/// itself a Monday 00:00.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use iiko_api::reports::next_week_start;
///
/// // Thursday
/// let dt = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(15, 0, 0).unwrap();
/// let monday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// assert_eq!(next_week_start(dt), monday);
/// ```
#[must_use]
pub fn next_week_start(dt: NaiveDateTime) -> NaiveDateTime {
    let day = dt.date();
    let this_monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (this_monday + Duration::days(7)).and_time(NaiveTime::MIN)
}

/// Splits `[from, to)` into consecutive week-aligned windows.
///
/// Every window but the last ends on a Monday 00:00; the last ends at `to`.
/// Windows are contiguous and never overlap. An empty or inverted range
/// yields no windows.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use iiko_api::reports::ReportWindows;
///
/// let from = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let to = NaiveDate::from_ymd_opt(2026, 1, 19).unwrap().and_hms_opt(0, 0, 0).unwrap();
///
/// let windows: Vec<_> = ReportWindows::new(from, to).collect();
/// assert_eq!(windows.len(), 3);
/// assert_eq!(windows[0].0, from);
/// assert_eq!(windows[2].1, to);
/// ```
#[derive(Clone, Debug)]
pub struct ReportWindows {
    cursor: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportWindows {
    /// Creates the window sequence for `[from, to)`.
    #[must_use]
    pub const fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            cursor: from,
            end: to,
        }
    }
}

impl Iterator for ReportWindows {
    type Item = (NaiveDateTime, NaiveDateTime);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let start = self.cursor;
        let end = next_week_start(start).min(self.end);
        self.cursor = end;
        Some((start, end))
    }
}

/// A `DateRange` filter on one report field.
///
/// Defaults to the half-open range `[from, to)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRangeFilter {
    /// Range start.
    pub from: NaiveDateTime,
    /// Range end.
    pub to: NaiveDateTime,
    /// Whether `from` itself is included.
    pub include_low: bool,
    /// Whether `to` itself is included.
    pub include_high: bool,
}

impl DateRangeFilter {
    /// Creates a half-open `[from, to)` filter.
    #[must_use]
    pub const fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self {
            from,
            to,
            include_low: true,
            include_high: false,
        }
    }

    /// Renders the filter as the server expects it in `filters`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use iiko_api::reports::DateRangeFilter;
    ///
    /// let from = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let to = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(0, 0, 0).unwrap();
    ///
    /// let value = DateRangeFilter::new(from, to).to_json();
    /// assert_eq!(value["filterType"], "DateRange");
    /// assert_eq!(value["to"], "2026-01-05T00:00:00.000");
    /// ```
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "filterType": "DateRange",
            "periodType": "CUSTOM",
            "from": format_filter_date(self.from),
            "to": format_filter_date(self.to),
            "includeLow": self.include_low,
            "includeHigh": self.include_high,
        })
    }
}
