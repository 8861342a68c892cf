//! Validated newtype wrappers for configuration values.
//!
//! These wrappers validate their contents on construction so that the rest
//! of the SDK can rely on well-formed credentials and URLs.

use crate::error::ConfigError;
use std::fmt;

/// A validated base URL of the RMS server API.
///
/// The URL is trimmed, any trailing `/` is stripped, and it must use the
/// `http` or `https` scheme with a non-empty host.
///
/// # Example
///
/// ```rust
/// use iiko_api::BaseUrl;
///
/// let url = BaseUrl::new("https://demo.iiko.it/resto/api/").unwrap();
/// assert_eq!(url.as_ref(), "https://demo.iiko.it/resto/api");
/// assert_eq!(url.join("/auth"), "https://demo.iiko.it/resto/api/auth");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Creates a new validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if the URL is not an absolute
    /// HTTP(S) URL.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let normalized = url.trim().trim_end_matches('/').to_string();

        let rest = normalized
            .strip_prefix("https://")
            .or_else(|| normalized.strip_prefix("http://"))
            .ok_or_else(|| ConfigError::InvalidBaseUrl { url: url.clone() })?;

        let host_end = rest.find([':', '/', '?', '#']).unwrap_or(rest.len());
        if rest[..host_end].is_empty() {
            return Err(ConfigError::InvalidBaseUrl { url });
        }

        Ok(Self(normalized))
    }

    /// Joins an endpoint path onto the base URL.
    ///
    /// Leading slashes on `path` are ignored so `"auth"` and `"/auth"`
    /// produce the same URL.
    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated RMS user login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Login(String);

impl Login {
    /// Creates a new validated login.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyLogin`] if the login is empty.
    pub fn new(login: impl Into<String>) -> Result<Self, ConfigError> {
        let login = login.into();
        if login.trim().is_empty() {
            return Err(ConfigError::EmptyLogin);
        }
        Ok(Self(login))
    }
}

impl AsRef<str> for Login {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated RMS user password.
///
/// # Security
///
/// The `Debug` implementation masks the value, displaying only
/// `Password(*****)`.
///
/// ```rust
/// use iiko_api::Password;
///
/// let password = Password::new("hunter2").unwrap();
/// assert_eq!(format!("{:?}", password), "Password(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Creates a new validated password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPassword`] if the password is empty.
    pub fn new(password: impl Into<String>) -> Result<Self, ConfigError> {
        let password = password.into();
        if password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        Ok(Self(password))
    }
}

impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(*****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_trailing_slashes() {
        let url = BaseUrl::new("  https://demo.iiko.it/resto/api//  ").unwrap();
        assert_eq!(url.as_ref(), "https://demo.iiko.it/resto/api");
    }

    #[test]
    fn test_base_url_accepts_port_and_plain_http() {
        let url = BaseUrl::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(url.as_ref(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_base_url_rejects_invalid() {
        assert!(BaseUrl::new("").is_err());
        assert!(BaseUrl::new("demo.iiko.it/resto/api").is_err());
        assert!(BaseUrl::new("ftp://demo.iiko.it").is_err());
        assert!(BaseUrl::new("https://").is_err());
        assert!(BaseUrl::new("https:///resto").is_err());
    }

    #[test]
    fn test_base_url_join_ignores_leading_slash() {
        let url = BaseUrl::new("https://demo.iiko.it/resto/api").unwrap();
        assert_eq!(url.join("auth"), "https://demo.iiko.it/resto/api/auth");
        assert_eq!(
            url.join("/v2/reports/olap"),
            "https://demo.iiko.it/resto/api/v2/reports/olap"
        );
    }

    #[test]
    fn test_login_rejects_blank() {
        assert!(matches!(Login::new(""), Err(ConfigError::EmptyLogin)));
        assert!(matches!(Login::new("   "), Err(ConfigError::EmptyLogin)));
        assert_eq!(Login::new("admin").unwrap().as_ref(), "admin");
    }

    #[test]
    fn test_password_masks_value_in_debug() {
        let password = Password::new("super-secret").unwrap();
        let debug_output = format!("{password:?}");
        assert_eq!(debug_output, "Password(*****)");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_password_rejects_empty() {
        assert!(matches!(Password::new(""), Err(ConfigError::EmptyPassword)));
    }
}
