//! OLAP report requests and results.
//!
//! The server recommends requesting no more than a month per report and no
//! more than seven fields. [`OlapReports::build_report_chunked`] splits long
//! ranges into week windows and merges the results client-side.

use std::fmt;

use chrono::NaiveDateTime;
use serde_json::{json, Map, Value};

use crate::client::IikoClient;
use crate::clients::{truncate_chars, HttpError, HttpMethod, HttpRequest, RequestBody};
use crate::reports::chunked::{ChunkAccumulator, ChunkedReport};
use crate::reports::columns::{parse_columns, ColumnDescriptor, PayloadFormat};
use crate::reports::dates::{format_query_date, DateRangeFilter, ReportWindows};
use crate::reports::errors::{ReportError, SNIPPET_LIMIT};

/// Path of the report endpoint.
pub const OLAP_PATH: &str = "v2/reports/olap";

/// Path of the column catalog endpoint.
pub const OLAP_COLUMNS_PATH: &str = "v2/reports/olap/columns";

/// Field count above which the server may respond slowly.
pub const RECOMMENDED_MAX_FIELDS: usize = 7;

/// An OLAP report type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ReportType {
    /// Sales (`SALES`).
    Sales,
    /// Deliveries (`DELIVERIES`).
    Deliveries,
    /// Transactions (`TRANSACTIONS`).
    Transactions,
    /// Orders (`ORDERS`).
    Orders,
    /// Any other report type the server knows.
    Custom(String),
}

impl ReportType {
    /// The report types known to exist on every server. Individual servers
    /// may offer more.
    #[must_use]
    pub const fn known() -> [Self; 4] {
        [Self::Sales, Self::Deliveries, Self::Transactions, Self::Orders]
    }

    /// The name sent as `reportType`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sales => "SALES",
            Self::Deliveries => "DELIVERIES",
            Self::Transactions => "TRANSACTIONS",
            Self::Orders => "ORDERS",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ReportType {
    fn from(name: &str) -> Self {
        match name {
            "SALES" => Self::Sales,
            "DELIVERIES" => Self::Deliveries,
            "TRANSACTIONS" => Self::Transactions,
            "ORDERS" => Self::Orders,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// Parameters of one report request.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use iiko_api::reports::{ReportRequest, ReportType};
///
/// let from = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let to = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
///
/// let request = ReportRequest::new(ReportType::Sales)
///     .date_range(from, to)
///     .group_by(["Department"])
///     .aggregate(["DishSumInt", "GuestNum"]);
///
/// assert_eq!(request.columns(), vec!["Department", "DishSumInt", "GuestNum"]);
/// assert_eq!(request.payload()["groupByRowFields"][0], "Department");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRequest {
    /// The report type.
    pub report_type: ReportType,
    /// Range start, sent as `dateFrom`.
    pub date_from: Option<NaiveDateTime>,
    /// Range end, sent as `dateTo`.
    pub date_to: Option<NaiveDateTime>,
    /// Row grouping fields.
    pub group_by: Vec<String>,
    /// Aggregated fields.
    pub aggregate_fields: Vec<String>,
    /// Filters keyed by field name.
    pub filters: Map<String, Value>,
    /// Whether the server should compute totals.
    pub summary: bool,
}

impl ReportRequest {
    /// Creates a request for `report_type` with totals enabled and nothing
    /// else set.
    #[must_use]
    pub fn new(report_type: ReportType) -> Self {
        Self {
            report_type,
            date_from: None,
            date_to: None,
            group_by: Vec::new(),
            aggregate_fields: Vec::new(),
            filters: Map::new(),
            summary: true,
        }
    }

    /// Sets both ends of the date range.
    #[must_use]
    pub const fn date_range(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Sets the grouping fields.
    #[must_use]
    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the aggregate fields.
    #[must_use]
    pub fn aggregate<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds (or replaces) the filter on `field`.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, filter: Value) -> Self {
        self.filters.insert(field.into(), filter);
        self
    }

    /// Sets whether totals are computed.
    #[must_use]
    pub const fn summary(mut self, summary: bool) -> Self {
        self.summary = summary;
        self
    }

    /// Grouping fields followed by aggregate fields.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .chain(&self.aggregate_fields)
            .cloned()
            .collect()
    }

    /// The JSON body. Empty field lists and filters are omitted.
    #[must_use]
    pub fn payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("reportType".to_string(), json!(self.report_type.as_str()));
        if !self.group_by.is_empty() {
            payload.insert("groupByRowFields".to_string(), json!(self.group_by));
        }
        if !self.aggregate_fields.is_empty() {
            payload.insert("aggregateFields".to_string(), json!(self.aggregate_fields));
        }
        if !self.filters.is_empty() {
            payload.insert("filters".to_string(), Value::Object(self.filters.clone()));
        }
        Value::Object(payload)
    }

    /// The query parameters: `summary` and whichever dates are set.
    #[must_use]
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![("summary".to_string(), self.summary.to_string())];
        if let Some(from) = self.date_from {
            query.push(("dateFrom".to_string(), format_query_date(from)));
        }
        if let Some(to) = self.date_to {
            query.push(("dateTo".to_string(), format_query_date(to)));
        }
        query
    }
}

/// A report result in uniform shape.
#[derive(Clone, Debug, PartialEq)]
pub struct OlapReport {
    /// Grouping fields followed by aggregate fields.
    pub columns: Vec<String>,
    /// The grouping fields requested.
    pub group_by: Vec<String>,
    /// The aggregate fields requested.
    pub aggregate_fields: Vec<String>,
    /// Row data as returned (`data`).
    pub rows: Vec<Value>,
    /// Totals keyed by aggregate field, when the server returned any.
    pub summary: Option<Map<String, Value>>,
    /// The full response.
    pub raw: Value,
}

impl OlapReport {
    /// Builds a report from a response body.
    ///
    /// Totals come from `summary`, or from `totals` when `summary` is absent
    /// or empty. A totals array holds the grouping columns first, so the
    /// aggregate values start at offset `group_by.len()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use iiko_api::reports::OlapReport;
    /// use serde_json::json;
    ///
    /// let report = OlapReport::from_raw(
    ///     &["Dept".to_string()],
    ///     &["Sum".to_string(), "Count".to_string()],
    ///     json!({"data": [], "summary": ["AllDepts", 123, 45]}),
    /// );
    /// let summary = report.summary.unwrap();
    /// assert_eq!(summary["Sum"], 123);
    /// assert_eq!(summary["Count"], 45);
    /// ```
    #[must_use]
    pub fn from_raw(group_by: &[String], aggregate_fields: &[String], raw: Value) -> Self {
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let summary = map_summary(group_by, aggregate_fields, &raw);

        Self {
            columns: group_by.iter().chain(aggregate_fields).cloned().collect(),
            group_by: group_by.to_vec(),
            aggregate_fields: aggregate_fields.to_vec(),
            rows,
            summary,
            raw,
        }
    }

    /// Returns each row as a field-name map.
    ///
    /// Object rows are returned as they are; array rows are zipped with
    /// [`OlapReport::columns`]. Any other row becomes an empty map.
    #[must_use]
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| match row {
                Value::Object(record) => record.clone(),
                Value::Array(values) => self
                    .columns
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect(),
                _ => Map::new(),
            })
            .collect()
    }
}

fn map_summary(
    group_by: &[String],
    aggregate_fields: &[String],
    raw: &Value,
) -> Option<Map<String, Value>> {
    if aggregate_fields.is_empty() {
        return None;
    }

    let totals = ["summary", "totals"]
        .into_iter()
        .filter_map(|key| raw.get(key))
        .find(|value| match value {
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
            _ => false,
        })?;

    let mapped: Map<String, Value> = match totals {
        Value::Object(by_name) => aggregate_fields
            .iter()
            .filter_map(|field| by_name.get(field).map(|v| (field.clone(), v.clone())))
            .collect(),
        Value::Array(items) => {
            let offset = group_by.len();
            let expected = offset + aggregate_fields.len();
            if items.len() < expected {
                tracing::warn!(
                    "Totals have {} values, expected {expected} ({offset} grouping + {} aggregate); mapping what is present",
                    items.len(),
                    aggregate_fields.len()
                );
            }
            aggregate_fields
                .iter()
                .enumerate()
                .filter_map(|(i, field)| items.get(offset + i).map(|v| (field.clone(), v.clone())))
                .collect()
        }
        _ => Map::new(),
    };

    if mapped.is_empty() {
        None
    } else {
        Some(mapped)
    }
}

/// OLAP report API bound to a client.
///
/// Obtained from [`IikoClient::olap`].
///
/// # Example
///
/// ```rust,ignore
/// use iiko_api::reports::{ReportRequest, ReportType};
///
/// let columns = client.olap().columns(&ReportType::Sales).await?;
///
/// let request = ReportRequest::new(ReportType::Sales)
///     .date_range(from, to)
///     .group_by(["Department"])
///     .aggregate(["DishSumInt"]);
/// let chunked = client.olap().build_report_chunked(&request, Some("OpenDate.Typed")).await?;
/// println!("{} rows in {} chunks", chunked.row_count(), chunked.chunks.len());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct OlapReports<'a> {
    client: &'a IikoClient,
}

impl<'a> OlapReports<'a> {
    /// Binds the report API to `client`.
    #[must_use]
    pub const fn new(client: &'a IikoClient) -> Self {
        Self { client }
    }

    /// Fetches the column catalog of a report type.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Client`] if the request fails
    /// - [`ReportError::InvalidJson`], [`ReportError::InvalidXml`] or
    ///   [`ReportError::UnexpectedPayload`] if the catalog is malformed
    pub async fn columns(
        &self,
        report_type: &ReportType,
    ) -> Result<Vec<ColumnDescriptor>, ReportError> {
        tracing::info!("Fetching OLAP columns for {report_type}");

        let request = HttpRequest::builder(HttpMethod::Get, OLAP_COLUMNS_PATH)
            .query_param("reportType", report_type.as_str())
            .build()
            .map_err(HttpError::from)?;
        let response = self.client.request(request).await?;

        let format = PayloadFormat::detect(response.content_type(), &response.body);
        let columns = parse_columns(format, &response.body)?;

        tracing::info!("Received {} columns", columns.len());
        Ok(columns)
    }

    /// Builds one report with a single request.
    ///
    /// The request is read-only, so the transport may retry it.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Client`] if the request fails
    /// - [`ReportError::InvalidJson`] if the response is not JSON
    pub async fn build_report(&self, request: &ReportRequest) -> Result<OlapReport, ReportError> {
        let field_count = request.group_by.len() + request.aggregate_fields.len();
        if field_count > RECOMMENDED_MAX_FIELDS {
            tracing::warn!(
                "{field_count} fields requested; the server recommends at most {RECOMMENDED_MAX_FIELDS}"
            );
        }

        tracing::info!("Building OLAP report {}", request.report_type);
        tracing::debug!(
            "Period: {:?} - {:?}",
            request.date_from.map(format_query_date),
            request.date_to.map(format_query_date)
        );

        let http_request = HttpRequest::builder(HttpMethod::Post, OLAP_PATH)
            .query(request.query())
            .body(RequestBody::json(&request.payload()))
            .idempotent(true)
            .build()
            .map_err(HttpError::from)?;
        let response = self.client.request(http_request).await?;

        let raw = response.json().map_err(|e| {
            let snippet = truncate_chars(&response.body, SNIPPET_LIMIT);
            tracing::error!("Failed to parse report response: {e}; payload starts with {snippet:?}");
            ReportError::InvalidJson {
                message: e.to_string(),
                snippet,
            }
        })?;

        Ok(OlapReport::from_raw(
            &request.group_by,
            &request.aggregate_fields,
            raw,
        ))
    }

    /// Builds a report through the older `GET` endpoint and returns the body
    /// unparsed.
    ///
    /// `columns` are sent as `columns[0]`, `columns[1]`, ...; `date_from`
    /// and `date_to` are passed through as given.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Client`] if the request fails.
    pub async fn build_report_raw(
        &self,
        report_type: &ReportType,
        columns: &[String],
        date_from: &str,
        date_to: &str,
        build_summary: bool,
    ) -> Result<String, ReportError> {
        if columns.len() > RECOMMENDED_MAX_FIELDS {
            tracing::warn!(
                "{} columns requested; the server recommends at most {RECOMMENDED_MAX_FIELDS}",
                columns.len()
            );
        }

        tracing::info!("Building OLAP report {report_type}");
        tracing::debug!("Period: {date_from} - {date_to}; columns: {columns:?}");

        let mut builder = HttpRequest::builder(HttpMethod::Get, OLAP_PATH)
            .query_param("reportType", report_type.as_str())
            .query_param("dateFrom", date_from)
            .query_param("dateTo", date_to)
            .query_param("buildSummary", build_summary.to_string());
        for (i, column) in columns.iter().enumerate() {
            builder = builder.query_param(format!("columns[{i}]"), column.as_str());
        }

        let response = self
            .client
            .request(builder.build().map_err(HttpError::from)?)
            .await?;

        tracing::info!("Report built");
        Ok(response.body)
    }

    /// Builds a report over a long date range as a series of week-aligned
    /// requests and merges them.
    ///
    /// When `date_filter_field` is given, each chunk also carries a
    /// half-open `DateRange` filter on that field for its window.
    ///
    /// # Errors
    ///
    /// - [`ReportError::MissingDateRange`] if either date is unset
    /// - [`ReportError::InvalidDateRange`] if the range is inverted
    /// - any error of [`OlapReports::build_report`]; chunks fetched before
    ///   the failure are discarded
    pub async fn build_report_chunked(
        &self,
        request: &ReportRequest,
        date_filter_field: Option<&str>,
    ) -> Result<ChunkedReport, ReportError> {
        let (Some(from), Some(to)) = (request.date_from, request.date_to) else {
            return Err(ReportError::MissingDateRange);
        };
        if from > to {
            return Err(ReportError::InvalidDateRange {
                from: format_query_date(from),
                to: format_query_date(to),
            });
        }

        let mut accumulator = ChunkAccumulator::new();
        for (window_start, window_end) in ReportWindows::new(from, to) {
            let mut chunk_request = request.clone().date_range(window_start, window_end);
            if let Some(field) = date_filter_field {
                chunk_request = chunk_request.filter(
                    field,
                    DateRangeFilter::new(window_start, window_end).to_json(),
                );
            }

            let report = self.build_report(&chunk_request).await?;
            let row_count = accumulator.push(window_start, window_end, report.raw);

            tracing::info!(
                "Chunk {} -> {}: {row_count} rows",
                format_query_date(window_start),
                format_query_date(window_end)
            );
        }

        tracing::info!(
            "Chunked report complete: {} rows in {} chunks",
            accumulator.row_count(),
            accumulator.chunk_count()
        );
        Ok(accumulator.finish(&request.group_by, &request.aggregate_fields))
    }
}
