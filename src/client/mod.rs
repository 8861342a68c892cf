//! The authenticated facade over session management and transport.
//!
//! # Overview
//!
//! [`IikoClient`] is the single entry point most callers need. It owns one
//! [`HttpClient`] and one [`SessionManager`] and attaches the session token
//! as the `key` query parameter of every authenticated request, logging in
//! lazily on first use.
//!
//! # Scoped usage
//!
//! A session occupies a license slot on the server until logout.
//! [`IikoClient::scoped`] guarantees the logout:
//!
//! ```rust,ignore
//! use iiko_api::{ClientError, IikoClient, IikoConfig};
//!
//! let client = IikoClient::new(IikoConfig::load()?)?;
//! let body = client
//!     .scoped(async |client| {
//!         let response = client.get("corporation/departments", None).await?;
//!         Ok::<_, ClientError>(response.body)
//!     })
//!     .await?;
//! ```

mod errors;

pub use errors::ClientError;

use std::collections::HashMap;
use std::fmt;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;

use crate::auth::{Session, SessionManager};
use crate::clients::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::config::IikoConfig;
use crate::reports::OlapReports;

/// Authenticated client for the RMS server API.
///
/// # Thread Safety
///
/// `IikoClient` is `Send + Sync`. Requests made through one client never
/// overlap on the wire; see [`HttpClient`].
///
/// # Example
///
/// ```rust,ignore
/// use iiko_api::{IikoClient, IikoConfig};
///
/// let client = IikoClient::new(IikoConfig::from_env()?)?;
///
/// let response = client.get("corporation/departments", None).await?;
/// println!("{}", response.body);
///
/// client.close().await;
/// ```
#[derive(Debug)]
pub struct IikoClient {
    config: Arc<IikoConfig>,
    http: Arc<HttpClient>,
    sessions: SessionManager,
}

// Verify IikoClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<IikoClient>();
};

impl IikoClient {
    /// Creates a client from the given configuration.
    ///
    /// A token persisted by a previous run is picked up here; no network
    /// call is made.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the HTTP client cannot be created.
    pub fn new(config: IikoConfig) -> Result<Self, HttpError> {
        let config = Arc::new(config);
        let http = Arc::new(HttpClient::new(&config)?);
        let sessions = SessionManager::new(Arc::clone(&config), Arc::clone(&http));

        tracing::debug!("Client created for {}", config.base_url());

        Ok(Self {
            config,
            http,
            sessions,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &IikoConfig {
        &self.config
    }

    /// Returns the session manager.
    #[must_use]
    pub const fn session(&self) -> &SessionManager {
        &self.sessions
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Returns `true` if a session token is cached.
    pub async fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated().await
    }

    /// Returns the cached session token, if any.
    pub async fn token(&self) -> Option<String> {
        self.sessions.token().await
    }

    /// Returns a copy of the current session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.sessions.session().await
    }

    /// Logs in (or reuses the cached token) and returns the token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] if the login fails.
    pub async fn authenticate(&self, force: bool) -> Result<String, ClientError> {
        Ok(self.sessions.authenticate(force).await?)
    }

    /// Ends the session. Local state is cleared even if the server call fails.
    pub async fn logout(&self) {
        self.sessions.logout().await;
    }

    /// Logs out and drops the client.
    ///
    /// The transport is only shared inside the client, so dropping it here
    /// closes its pooled connections.
    pub async fn close(self) {
        self.sessions.logout().await;
        let base_url = self.config.base_url().clone();
        drop(self);
        tracing::debug!("Client for {base_url} closed, connections released");
    }

    /// Runs `body` inside an authenticated session, then logs out and closes
    /// the client.
    ///
    /// Cleanup runs whether `body` succeeds, fails or panics, and also when
    /// the initial login fails. The body's result is returned after cleanup;
    /// a panic is resumed after cleanup.
    ///
    /// Dropping the returned future before it completes skips cleanup. The
    /// persisted token then stays on disk and the next client reuses it.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the login failure converted with
    /// `From<ClientError>`.
    pub async fn scoped<F, T, E>(self, body: F) -> Result<T, E>
    where
        F: AsyncFnOnce(&Self) -> Result<T, E>,
        E: From<ClientError>,
    {
        let outcome = match self.authenticate(false).await {
            Ok(_) => AssertUnwindSafe(body(&self)).catch_unwind().await,
            Err(e) => Ok(Err(E::from(e))),
        };
        self.close().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!("Scoped session body panicked; session was closed");
                resume_unwind(panic)
            }
        }
    }

    /// Sends a request, attaching the session token if the request is
    /// authenticated.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Auth`] if no token could be obtained
    /// - [`ClientError::Http`] if the request failed
    pub async fn request(&self, mut request: HttpRequest) -> Result<HttpResponse, ClientError> {
        if request.authenticated {
            let token = self.sessions.get_token().await?;
            request.set_query_param("key", token);
        }
        Ok(self.http.request(request).await?)
    }

    /// Sends an authenticated GET request.
    ///
    /// # Errors
    ///
    /// See [`IikoClient::request`].
    pub async fn get(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, ClientError> {
        self.send(HttpMethod::Get, path, None, query).await
    }

    /// Sends an authenticated POST request.
    ///
    /// POST requests are not retried automatically. Build an
    /// [`HttpRequest`] marked idempotent for read-only POST endpoints.
    ///
    /// # Errors
    ///
    /// See [`IikoClient::request`].
    pub async fn post(
        &self,
        path: &str,
        body: Option<RequestBody>,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, ClientError> {
        self.send(HttpMethod::Post, path, body, query).await
    }

    /// Sends an authenticated PUT request.
    ///
    /// # Errors
    ///
    /// See [`IikoClient::request`].
    pub async fn put(
        &self,
        path: &str,
        body: Option<RequestBody>,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, ClientError> {
        self.send(HttpMethod::Put, path, body, query).await
    }

    /// Sends an authenticated DELETE request.
    ///
    /// # Errors
    ///
    /// See [`IikoClient::request`].
    pub async fn delete(
        &self,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, ClientError> {
        self.send(HttpMethod::Delete, path, None, query).await
    }

    /// Returns the OLAP report API bound to this client.
    #[must_use]
    pub const fn olap(&self) -> OlapReports<'_> {
        OlapReports::new(self)
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<RequestBody>,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, ClientError> {
        let mut builder = HttpRequest::builder(method, path.trim_start_matches('/'));
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let request = builder.build().map_err(HttpError::from)?;
        self.request(request).await
    }
}

impl fmt::Display for IikoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sessions.has_token() {
            write!(f, "IikoClient(authenticated)")
        } else {
            write!(f, "IikoClient(not authenticated)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BaseUrl, Login, Password};
    use tempfile::TempDir;

    fn client_in(dir: &TempDir) -> IikoClient {
        let config = IikoConfig::builder()
            .base_url(BaseUrl::new("http://127.0.0.1:9/resto/api").unwrap())
            .login(Login::new("admin").unwrap())
            .password(Password::new("secret").unwrap())
            .token_storage_path(dir.path().join(".token"))
            .max_retries(0)
            .build()
            .unwrap();
        IikoClient::new(config).unwrap()
    }

    #[test]
    fn test_display_without_token() {
        let dir = TempDir::new().unwrap();
        assert_eq!(client_in(&dir).to_string(), "IikoClient(not authenticated)");
    }

    #[test]
    fn test_display_with_persisted_token() {
        let dir = TempDir::new().unwrap();
        crate::auth::TokenStore::new(dir.path().join(".token")).save("abc");
        assert_eq!(client_in(&dir).to_string(), "IikoClient(authenticated)");
    }

    #[tokio::test]
    async fn test_empty_path_is_rejected_before_login() {
        let dir = TempDir::new().unwrap();
        let client = client_in(&dir);

        let result = client.delete("/", None).await;

        assert!(matches!(
            result,
            Err(ClientError::Http(HttpError::InvalidRequest(_)))
        ));
        assert!(!client.is_authenticated().await);
    }
}
