//! HTTP transport types for RMS server API communication.
//!
//! This module provides the low-level layer used by the session manager and
//! the [`IikoClient`](crate::IikoClient) facade.
//!
//! # Overview
//!
//! - [`HttpClient`]: The async transport with pacing and retry
//! - [`HttpRequest`]: A request to be sent to the API
//! - [`HttpResponse`]: A response from the API
//! - [`HttpMethod`]: Supported HTTP methods (GET, POST, PUT, DELETE)
//! - [`RequestBody`] / [`DataType`]: Request bodies and their content types
//! - [`RetryPolicy`]: Retry budget and backoff
//!
//! # Pacing
//!
//! Every request waits until at least [`MIN_REQUEST_INTERVAL`] has elapsed
//! since the previous one finished. Requests through one client never
//! overlap.
//!
//! # Retry Behavior
//!
//! - **429, 500, 502, 503, 504**: retried with exponential backoff
//!   (`Retry-After` is honored for 429 and 503)
//! - **Connection errors and timeouts**: retried with exponential backoff
//! - **Other non-2xx**: returned immediately as [`HttpError::Response`]
//!
//! Only idempotent requests are retried. POST requests are not retried
//! unless the builder marks them idempotent.

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod retry;

pub use errors::{
    truncate_chars, HttpError, HttpResponseError, InvalidHttpRequestError,
    MaxHttpRetriesExceededError, ERROR_BODY_LIMIT,
};
pub use http_client::{HttpClient, MIN_REQUEST_INTERVAL, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder, RequestBody};
pub use http_response::HttpResponse;
pub use retry::{RetryPolicy, MAX_BACKOFF, RETRYABLE_STATUSES};
