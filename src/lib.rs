//! # iiko RMS API
//!
//! A Rust client for the iiko RMS server API, providing type-safe
//! configuration, session token reuse, a paced HTTP transport and OLAP
//! report helpers.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`IikoConfig`] and [`IikoConfigBuilder`],
//!   loadable from the environment or a `.env` file
//! - Session management that reuses a persisted token across runs, since
//!   every login occupies a server license slot
//! - An async HTTP transport that keeps requests strictly sequential with a
//!   100 ms pause between them and retries transient failures
//! - The [`IikoClient`] facade with scoped login/logout
//! - OLAP column discovery (JSON or XML) and report building, including
//!   chunked week-by-week aggregation over long date ranges
//!
//! ## Quick Start
//!
//! ```rust
//! use iiko_api::{IikoConfig, BaseUrl, Login, Password};
//!
//! let config = IikoConfig::builder()
//!     .base_url(BaseUrl::new("https://demo.iiko.it/resto/api").unwrap())
//!     .login(Login::new("admin").unwrap())
//!     .password(Password::new("secret").unwrap())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making Requests
//!
//! ```rust,ignore
//! use iiko_api::{ClientError, IikoClient, IikoConfig};
//!
//! let client = IikoClient::new(IikoConfig::load()?)?;
//!
//! // Logs in (or reuses the saved token), runs the body, then always logs out
//! let departments = client
//!     .scoped(async |client| {
//!         let response = client.get("corporation/departments", None).await?;
//!         Ok::<_, ClientError>(response.body)
//!     })
//!     .await?;
//! ```
//!
//! ## OLAP Reports
//!
//! ```rust,ignore
//! use iiko_api::reports::{parse_api_date, ReportRequest, ReportType};
//!
//! let request = ReportRequest::new(ReportType::Sales)
//!     .date_range(parse_api_date("2026-01-01")?, parse_api_date("2026-02-02")?)
//!     .group_by(["Department"])
//!     .aggregate(["DishDiscountSumInt"]);
//!
//! let result = client.olap().build_report_chunked(&request, Some("OpenDate.Typed")).await?;
//! println!("{} rows, totals: {:?}", result.row_count(), result.report.summary);
//! ```
//!
//! ## Logging
//!
//! The SDK logs through [`tracing`] and never installs a subscriber. Query
//! parameters carrying the password or the session token are masked.

pub mod auth;
pub mod client;
pub mod clients;
pub mod config;
pub mod error;
pub mod reports;

// Re-export public types at crate root for convenience
pub use auth::{AuthError, Session, SessionManager, SessionState, StoredToken, TokenStore};
pub use client::{ClientError, IikoClient};
pub use config::{BaseUrl, IikoConfig, IikoConfigBuilder, Login, Password};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    DataType, HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse,
    HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError, RequestBody,
    RetryPolicy,
};

// Re-export report types
pub use reports::{
    ChunkedReport, ColumnDescriptor, OlapReport, OlapReports, ReportError, ReportRequest,
    ReportType,
};
