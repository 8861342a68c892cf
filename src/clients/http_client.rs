//! HTTP transport for the RMS server API.
//!
//! This module provides the [`HttpClient`] type, which executes requests
//! with bounded retry, a per-attempt timeout, and a minimum pause between
//! consecutive requests.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::clients::errors::{
    truncate_chars, HttpError, HttpResponseError, MaxHttpRetriesExceededError, ERROR_BODY_LIMIT,
};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::retry::RetryPolicy;
use crate::config::{BaseUrl, IikoConfig};

/// Minimum pause between the end of one request and the start of the next.
///
/// The RMS server expects requests to arrive one after another, so this
/// applies to every request made through one client regardless of endpoint.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Query parameters whose values never appear in logs.
const SENSITIVE_PARAMS: [&str; 2] = ["key", "pass"];

/// Holds the pacing lock and stamps the completion time when released.
///
/// Released on every exit path, including a cancelled request future.
struct PacingGuard<'a>(MutexGuard<'a, Option<Instant>>);

impl Drop for PacingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = Some(Instant::now());
    }
}

/// HTTP client for making requests to the RMS server API.
///
/// The client handles:
/// - URL construction from the configured base URL
/// - Default headers including User-Agent
/// - Strictly sequential requests with [`MIN_REQUEST_INTERVAL`] between them
/// - Automatic retry with exponential backoff for 429/5xx and network errors
///   on idempotent requests
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`. Concurrent callers are queued: a request
/// holds the pacing lock from its first attempt until its final response.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: BaseUrl,
    default_headers: HashMap<String, String>,
    retry: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client from the SDK configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(config: &IikoConfig) -> Result<Self, HttpError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent = format!("{user_agent_prefix}iiko-rms-api v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert(
            "Accept".to_string(),
            "application/json, application/xml;q=0.9, */*;q=0.8".to_string(),
        );

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().clone(),
            default_headers,
            retry: RetryPolicy::new(config.max_retries(), config.retry_backoff()),
            last_request: Mutex::new(None),
        })
    }

    /// Returns the base URL for this client.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the retry policy for this client.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Sends an HTTP request to the RMS server API.
    ///
    /// Waits until [`MIN_REQUEST_INTERVAL`] has passed since the previous
    /// request finished, then sends the request, retrying idempotent requests
    /// on 429/500/502/503/504 and on connection errors or timeouts. The
    /// completion time is recorded whether or not the request succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error or timeout occurs (`Network`)
    /// - Non-2xx response received (`Response`)
    /// - A retryable status persisted after all retries (`MaxRetries`)
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let pacing = PacingGuard(self.last_request.lock().await);
        if let Some(finished) = *pacing.0 {
            let elapsed = finished.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }

        self.execute(&request).await
    }

    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = self.base_url.join(&request.path);
        let max_attempts = if request.idempotent {
            self.retry.max_attempts()
        } else {
            1
        };

        let mut headers = self.default_headers.clone();
        if let Some(body) = &request.body {
            headers.insert(
                "Content-Type".to_string(),
                body.data_type.as_content_type().to_string(),
            );
        }
        for (key, value) in &request.extra_headers {
            headers.insert(key.clone(), value.clone());
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            tracing::debug!(
                "{} {} query={}",
                request.http_method,
                url,
                redacted_query(&request.query)
            );

            let mut req_builder = match request.http_method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
                HttpMethod::Put => self.client.put(&url),
                HttpMethod::Delete => self.client.delete(&url),
            };
            for (key, value) in &headers {
                req_builder = req_builder.header(key, value);
            }
            if !request.query.is_empty() {
                req_builder = req_builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                req_builder = req_builder.body(body.content.clone());
            }

            let res = match req_builder.send().await {
                Ok(res) => res,
                Err(e) if attempt < max_attempts && (e.is_connect() || e.is_timeout()) => {
                    let delay = self.retry.delay_for_attempt(attempt - 1);
                    tracing::warn!(
                        "{} {} failed ({e}); retrying in {:?} (attempt {attempt}/{max_attempts})",
                        request.http_method,
                        request.path,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let code = res.status().as_u16();
            let res_headers = Self::parse_response_headers(res.headers());
            let body = res.text().await?;
            let response = HttpResponse::new(code, res_headers, body);

            tracing::debug!("Response: {code} ({} bytes)", response.body.len());

            if response.is_ok() {
                return Ok(response);
            }

            if !RetryPolicy::should_retry_status(code) || max_attempts == 1 {
                return Err(HttpError::Response(HttpResponseError {
                    code,
                    body: truncate_chars(&response.body, ERROR_BODY_LIMIT),
                }));
            }

            if attempt >= max_attempts {
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code,
                    tries: attempt,
                    body: truncate_chars(&response.body, ERROR_BODY_LIMIT),
                }));
            }

            let delay =
                self.retry
                    .delay_for_status(attempt - 1, code, response.retry_after_secs());
            tracing::warn!(
                "{} {} returned {code}; retrying in {:?} (attempt {attempt}/{max_attempts})",
                request.http_method,
                request.path,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

/// Renders query parameters for logging with credentials masked.
fn redacted_query(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(k, v)| {
            if SENSITIVE_PARAMS.contains(&k.as_str()) {
                format!("{k}=***")
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Login, Password};

    fn test_config() -> IikoConfig {
        IikoConfig::builder()
            .base_url(BaseUrl::new("https://demo.iiko.it/resto/api").unwrap())
            .login(Login::new("admin").unwrap())
            .password(Password::new("secret").unwrap())
            .max_retries(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_construction() {
        let client = HttpClient::new(&test_config()).unwrap();

        assert_eq!(client.base_url().as_ref(), "https://demo.iiko.it/resto/api");
        assert_eq!(client.retry_policy().max_retries, 2);
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = HttpClient::new(&test_config()).unwrap();

        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.contains("iiko-rms-api v"));
        assert!(user_agent.contains("Rust"));
    }

    #[test]
    fn test_user_agent_with_prefix() {
        let config = IikoConfig::builder()
            .base_url(BaseUrl::new("https://demo.iiko.it/resto/api").unwrap())
            .login(Login::new("admin").unwrap())
            .password(Password::new("secret").unwrap())
            .user_agent_prefix("Reporting/2.1")
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();

        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("Reporting/2.1 | "));
    }

    #[test]
    fn test_redacted_query_masks_credentials() {
        let query = vec![
            ("login".to_string(), "admin".to_string()),
            ("pass".to_string(), "secret".to_string()),
            ("key".to_string(), "token-value".to_string()),
        ];
        let rendered = redacted_query(&query);
        assert_eq!(rendered, "login=admin&pass=***&key=***");
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpClient>();
    }
}
