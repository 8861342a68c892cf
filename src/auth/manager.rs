//! Session token lifecycle.
//!
//! Every login occupies one of a limited number of license slots on the RMS
//! server. The manager therefore reuses a cached (or previously persisted)
//! token whenever it can and only logs in again when forced to or when the
//! server rejects the current token.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::{AuthError, Session, SessionState, TokenStore};
use crate::clients::{
    DataType, HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse,
};
use crate::config::{IikoConfig, AUTH_PATH, LOGOUT_PATH};

/// Endpoint probed by [`SessionManager::validate`].
pub const VALIDATION_PATH: &str = "corporation/organizations";

#[derive(Debug)]
struct SessionSlot {
    state: SessionState,
    session: Option<Session>,
}

/// Obtains, caches, validates and releases the session token.
///
/// The token lives in memory and in the [`TokenStore`] file. Only the
/// manager mutates either copy.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use iiko_api::{HttpClient, IikoConfig, SessionManager};
///
/// let config = Arc::new(IikoConfig::from_env()?);
/// let http = Arc::new(HttpClient::new(&config)?);
/// let sessions = SessionManager::new(config, http);
///
/// let token = sessions.get_token().await?;
/// // ... use the token ...
/// sessions.logout().await;
/// ```
#[derive(Debug)]
pub struct SessionManager {
    config: Arc<IikoConfig>,
    http: Arc<HttpClient>,
    store: TokenStore,
    slot: Mutex<SessionSlot>,
}

impl SessionManager {
    /// Creates a session manager, picking up a previously persisted token.
    ///
    /// A persisted token puts the manager straight into
    /// [`SessionState::Authenticated`] without asking the server whether it
    /// is still valid.
    #[must_use]
    pub fn new(config: Arc<IikoConfig>, http: Arc<HttpClient>) -> Self {
        let store = TokenStore::new(config.token_storage_path());
        let session = store.load().map(Session::from);

        let state = if session.is_some() {
            tracing::info!("Loaded saved token from {}", store.path().display());
            SessionState::Authenticated
        } else {
            SessionState::NoToken
        };

        Self {
            config,
            http,
            store,
            slot: Mutex::new(SessionSlot { state, session }),
        }
    }

    /// Returns the token store backing this manager.
    #[must_use]
    pub const fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.slot.lock().await.state
    }

    /// Returns a copy of the current session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.slot.lock().await.session.clone()
    }

    /// Returns the cached token, if any.
    pub async fn token(&self) -> Option<String> {
        self.slot
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.token.clone())
    }

    /// Returns `true` if a token is cached.
    pub async fn is_authenticated(&self) -> bool {
        self.slot.lock().await.session.is_some()
    }

    /// Non-blocking variant of [`SessionManager::is_authenticated`].
    ///
    /// Reports `false` while a login or logout is in flight.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.slot
            .try_lock()
            .is_ok_and(|slot| slot.session.is_some())
    }

    /// Returns the cached token, logging in first if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::authenticate`].
    pub async fn get_token(&self) -> Result<String, AuthError> {
        self.authenticate(false).await
    }

    /// Logs in and returns the session token.
    ///
    /// Without `force`, a cached token is returned with no network call.
    /// With `force`, a new login is always issued.
    ///
    /// # Errors
    ///
    /// - [`AuthError::EmptyToken`] if the server answered with a blank body
    /// - [`AuthError::Http`] if the login call failed
    pub async fn authenticate(&self, force: bool) -> Result<String, AuthError> {
        let mut slot = self.slot.lock().await;
        self.authenticate_locked(&mut slot, force).await
    }

    /// Probes the server with the current token.
    ///
    /// Returns `false` when there is no token or the probe fails for any
    /// reason; never returns an error.
    pub async fn validate(&self) -> bool {
        let Some(token) = self.token().await else {
            return false;
        };

        tracing::debug!(
            "Validating token against {}",
            self.config.endpoint_url(VALIDATION_PATH)
        );
        let probe = HttpRequest::builder(HttpMethod::Get, VALIDATION_PATH)
            .query_param("key", token)
            .unauthenticated();

        match self.send(probe).await {
            Ok(response) => response.code == 200,
            Err(e) => {
                tracing::debug!("Token validation failed: {e}");
                false
            }
        }
    }

    /// Returns a token the server accepts, logging in again if the current
    /// one fails validation.
    ///
    /// An invalid token is dropped from memory and from disk before the new
    /// login.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::authenticate`].
    pub async fn refresh_if_needed(&self) -> Result<String, AuthError> {
        if self.validate().await {
            if let Some(token) = self.token().await {
                return Ok(token);
            }
        }

        let mut slot = self.slot.lock().await;
        if slot.session.take().is_some() {
            tracing::info!("Token is no longer valid, re-authenticating");
            slot.state = SessionState::Invalid;
        }
        self.store.clear();
        self.authenticate_locked(&mut slot, true).await
    }

    /// Ends the session and releases its license slot.
    ///
    /// The server-side logout is best effort: failures are logged, and the
    /// token is cleared from memory and disk regardless.
    pub async fn logout(&self) {
        let mut slot = self.slot.lock().await;
        let Some(session) = slot.session.take() else {
            tracing::info!("No token, logout not required");
            return;
        };

        tracing::info!("Logging out via {}", self.config.logout_url());
        let request = HttpRequest::builder(HttpMethod::Get, LOGOUT_PATH)
            .query_param("key", session.token)
            .unauthenticated();

        match self.send(request).await {
            Ok(_) => tracing::info!("Logout complete"),
            Err(e) => tracing::warn!("Logout request failed: {e}"),
        }

        slot.state = SessionState::NoToken;
        self.store.clear();
    }

    async fn authenticate_locked(
        &self,
        slot: &mut SessionSlot,
        force: bool,
    ) -> Result<String, AuthError> {
        if !force {
            if let Some(session) = &slot.session {
                tracing::debug!("Using cached token {}", session.token_preview());
                return Ok(session.token.clone());
            }
        }

        tracing::info!(
            "Authenticating as '{}' at {}",
            self.config.login().as_ref(),
            self.config.auth_url()
        );
        let previous = slot.state;
        slot.state = SessionState::Authenticating;

        match self.login().await {
            Ok(session) => {
                tracing::info!("Authentication successful");
                tracing::debug!("Token: {}", session.token_preview());
                self.store.save(&session.token);
                let token = session.token.clone();
                slot.session = Some(session);
                slot.state = SessionState::Authenticated;
                Ok(token)
            }
            Err(e) => {
                tracing::error!("Authentication failed: {e}");
                slot.state = if slot.session.is_some() {
                    SessionState::Authenticated
                } else if previous == SessionState::Invalid {
                    SessionState::Invalid
                } else {
                    SessionState::NoToken
                };
                Err(e)
            }
        }
    }

    async fn login(&self) -> Result<Session, AuthError> {
        // Not retried: each attempt may take a license slot.
        let request = HttpRequest::builder(HttpMethod::Post, AUTH_PATH)
            .query_param("login", self.config.login().as_ref())
            .query_param("pass", self.config.password().as_ref())
            .header("Content-Type", DataType::Form.as_content_type())
            .unauthenticated()
            .idempotent(false);

        let response = self.send(request).await?;
        let token = response.body.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(Session::new(token))
    }

    async fn send(&self, builder: HttpRequestBuilder) -> Result<HttpResponse, HttpError> {
        self.http.request(builder.build()?).await
    }
}
