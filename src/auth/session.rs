//! Session state for the RMS server API.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::auth::StoredToken;

/// An authenticated session: the token and when it was obtained.
///
/// # Example
///
/// ```rust
/// use iiko_api::Session;
///
/// let session = Session::new("0f3c9a2e-5b1d-4c55-9d0e-7e1a3f0c2b44");
/// assert_eq!(session.token_preview(), "0f3c9a2e...");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// The session token, sent as the `key` query parameter.
    pub token: String,
    /// When the token was obtained. `None` for a persisted token whose
    /// timestamp was missing or unreadable.
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Creates a session for a freshly issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// Short prefix of the token that is safe to log.
    #[must_use]
    pub fn token_preview(&self) -> String {
        let prefix: String = self.token.chars().take(8).collect();
        if prefix.len() < self.token.len() {
            format!("{prefix}...")
        } else {
            prefix
        }
    }
}

impl From<StoredToken> for Session {
    fn from(stored: StoredToken) -> Self {
        if stored.created_at.is_none() {
            tracing::debug!("Persisted token has no timestamp; its age is unknown");
        }
        Self {
            token: stored.token,
            created_at: stored.created_at,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token_preview())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Lifecycle state of a [`SessionManager`](crate::auth::SessionManager).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No token: never authenticated or explicitly logged out.
    NoToken,
    /// A login call is in flight.
    Authenticating,
    /// A token is cached (it may not have been validated against the server).
    Authenticated,
    /// The cached token failed validation or a login attempt failed after it.
    Invalid,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => write!(f, "no token"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}
