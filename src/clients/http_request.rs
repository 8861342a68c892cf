//! HTTP request types for the iiko RMS API SDK.
//!
//! This module provides the [`HttpRequest`] type and its builder for
//! constructing requests to the RMS server API.

use std::collections::HashMap;
use std::fmt;

use crate::clients::errors::InvalidHttpRequestError;

/// HTTP methods supported by the SDK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
}

impl HttpMethod {
    /// Returns `true` for methods that may be repeated without side effects.
    #[must_use]
    pub const fn is_idempotent(self) -> bool {
        !matches!(self, Self::Post)
    }

    /// Returns `true` for methods that may carry a request body.
    #[must_use]
    pub const fn allows_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Content type for HTTP request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// JSON content type (`application/json`).
    Json,
    /// XML content type (`application/xml`), used by the RMS import endpoints.
    Xml,
    /// Form content type (`application/x-www-form-urlencoded`).
    Form,
}

impl DataType {
    /// Returns the MIME type string for this data type.
    #[must_use]
    pub const fn as_content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }
}

/// A request body together with its content type.
///
/// # Example
///
/// ```rust
/// use iiko_api::clients::{DataType, RequestBody};
/// use serde_json::json;
///
/// let body = RequestBody::json(&json!({"reportType": "SALES"}));
/// assert_eq!(body.data_type, DataType::Json);
///
/// let body = RequestBody::form([("login", "admin"), ("note", "a&b")]);
/// assert_eq!(body.content, "login=admin&note=a%26b");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestBody {
    /// The serialized body.
    pub content: String,
    /// How the body is encoded.
    pub data_type: DataType,
}

impl RequestBody {
    /// Serializes a JSON value as the body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content: value.to_string(),
            data_type: DataType::Json,
        }
    }

    /// Uses an XML document as the body.
    #[must_use]
    pub fn xml(document: impl Into<String>) -> Self {
        Self {
            content: document.into(),
            data_type: DataType::Xml,
        }
    }

    /// Encodes key/value pairs as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let content = pairs
            .into_iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k.as_ref()),
                    urlencoding::encode(v.as_ref())
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        Self {
            content,
            data_type: DataType::Form,
        }
    }
}

/// An HTTP request to be sent to the RMS server API.
///
/// Use [`HttpRequest::builder`] to construct requests.
///
/// # Example
///
/// ```rust
/// use iiko_api::clients::{HttpRequest, HttpMethod};
///
/// let request = HttpRequest::builder(HttpMethod::Get, "v2/reports/olap/columns")
///     .query_param("reportType", "SALES")
///     .build()
///     .unwrap();
///
/// assert!(request.authenticated);
/// assert!(request.idempotent);
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub http_method: HttpMethod,
    /// The path relative to the configured base URL.
    pub path: String,
    /// Query parameters, sent in insertion order.
    pub query: Vec<(String, String)>,
    /// The request body, if any.
    pub body: Option<RequestBody>,
    /// Additional headers to include in the request.
    pub extra_headers: HashMap<String, String>,
    /// Whether the session token must be attached as the `key` parameter.
    pub authenticated: bool,
    /// Whether the transport may retry this request automatically.
    pub idempotent: bool,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the path is empty or a body is
    /// attached to a GET or DELETE request.
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.path.trim_matches('/').is_empty() {
            return Err(InvalidHttpRequestError::EmptyPath);
        }

        if self.body.is_some() && !self.http_method.allows_body() {
            return Err(InvalidHttpRequestError::BodyNotAllowed {
                method: self.http_method.to_string(),
            });
        }

        Ok(())
    }

    /// Returns the value of a query parameter, if set.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a query parameter, replacing an existing value with the same key.
    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key, value)),
        }
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            request: HttpRequest {
                http_method: method,
                path: path.into(),
                query: Vec::new(),
                body: None,
                extra_headers: HashMap::new(),
                authenticated: true,
                idempotent: method.is_idempotent(),
            },
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.request.body = Some(body);
        self
    }

    /// Replaces all query parameters at once.
    #[must_use]
    pub fn query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.request.query = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.set_query_param(key, value);
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.extra_headers.insert(key.into(), value.into());
        self
    }

    /// Marks the request as not requiring a session token.
    #[must_use]
    pub const fn unauthenticated(mut self) -> Self {
        self.request.authenticated = false;
        self
    }

    /// Overrides whether the request may be retried automatically.
    ///
    /// Defaults to [`HttpMethod::is_idempotent`]. Read-only POST endpoints
    /// can opt in; requests that consume server-side resources should not.
    #[must_use]
    pub const fn idempotent(mut self, idempotent: bool) -> Self {
        self.request.idempotent = idempotent;
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        self.request.verify()?;
        Ok(self.request)
    }
}
