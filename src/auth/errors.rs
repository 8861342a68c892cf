//! Authentication error types.

use crate::clients::HttpError;
use thiserror::Error;

/// Errors that can occur while obtaining a session token.
///
/// # Example
///
/// ```rust
/// use iiko_api::auth::AuthError;
///
/// let error = AuthError::EmptyToken;
/// assert!(error.to_string().contains("empty token"));
/// ```
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login call succeeded but the body held no token.
    ///
    /// This is not retried: every login attempt may occupy a license slot.
    #[error("Server returned an empty token in response to login")]
    EmptyToken,

    /// The login call failed at the HTTP level.
    #[error("Authentication request failed: {0}")]
    Http(#[from] HttpError),
}
