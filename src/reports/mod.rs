//! OLAP reports: column discovery, report building and chunked aggregation.
//!
//! # Overview
//!
//! - [`OlapReports`]: Report API bound to an [`IikoClient`](crate::IikoClient)
//! - [`ReportRequest`] / [`ReportType`]: What to request
//! - [`OlapReport`]: A result with columns, rows and named totals
//! - [`ColumnDescriptor`]: One entry of a column catalog (JSON or XML)
//! - [`ChunkedReport`]: A merged multi-window result with its chunk log
//!
//! # Chunking
//!
//! The server handles long date ranges poorly. A chunked run requests one
//! week-aligned window at a time (see [`ReportWindows`]), concatenates the
//! rows in window order and adds up the totals with [`merge_totals`].
//!
//! # Example
//!
//! ```rust,ignore
//! use iiko_api::reports::{parse_api_date, ReportRequest, ReportType};
//!
//! let request = ReportRequest::new(ReportType::Sales)
//!     .date_range(parse_api_date("2026-01-01")?, parse_api_date("2026-02-02")?)
//!     .group_by(["OpenDate.Typed", "Department"])
//!     .aggregate(["DishDiscountSumInt", "GuestNum"]);
//!
//! let result = client
//!     .olap()
//!     .build_report_chunked(&request, Some("OpenDate.Typed"))
//!     .await?;
//! for chunk in &result.chunks {
//!     println!("{} -> {}: {} rows", chunk.window_start, chunk.window_end, chunk.row_count);
//! }
//! ```

mod chunked;
mod columns;
mod dates;
mod errors;
mod olap;

pub use chunked::{merge_totals, ChunkAccumulator, ChunkRecord, ChunkedReport};
pub use columns::{
    parse_columns, parse_columns_json, parse_columns_xml, ColumnDescriptor, PayloadFormat,
};
pub use dates::{
    format_filter_date, format_query_date, next_week_start, parse_api_date, DateRangeFilter,
    ReportWindows, FILTER_DATE_FORMAT, QUERY_DATE_FORMAT,
};
pub use errors::{ReportError, SNIPPET_LIMIT};
pub use olap::{
    OlapReport, OlapReports, ReportRequest, ReportType, OLAP_COLUMNS_PATH, OLAP_PATH,
    RECOMMENDED_MAX_FIELDS,
};
