//! Facade error types.

use crate::auth::AuthError;
use crate::clients::HttpError;
use thiserror::Error;

/// Errors returned by [`IikoClient`](crate::IikoClient) requests.
///
/// # Example
///
/// ```rust
/// use iiko_api::{AuthError, ClientError};
///
/// let error = ClientError::from(AuthError::EmptyToken);
/// assert!(matches!(error, ClientError::Auth(_)));
/// ```
#[derive(Debug, Error)]
pub enum ClientError {
    /// A session token could not be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request itself failed.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ClientError {
    /// Returns the HTTP status code behind this error, if there is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth(AuthError::Http(e)) | Self::Http(e) => e.status(),
            Self::Auth(AuthError::EmptyToken) => None,
        }
    }
}
