//! Configuration types for the iiko RMS API SDK.
//!
//! # Overview
//!
//! - [`IikoConfig`]: Immutable settings shared by every layer of the SDK
//! - [`IikoConfigBuilder`]: A builder for constructing [`IikoConfig`] instances
//! - [`BaseUrl`], [`Login`], [`Password`]: Validated newtypes
//!
//! Configuration is built once at process start and passed explicitly into
//! [`IikoClient`](crate::IikoClient). There is no global settings instance.
//!
//! # Example
//!
//! ```rust
//! use iiko_api::{IikoConfig, BaseUrl, Login, Password};
//!
//! let config = IikoConfig::builder()
//!     .base_url(BaseUrl::new("https://demo.iiko.it/resto/api").unwrap())
//!     .login(Login::new("admin").unwrap())
//!     .password(Password::new("secret").unwrap())
//!     .max_retries(5)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.auth_url(), "https://demo.iiko.it/resto/api/auth");
//! ```
//!
//! # Environment
//!
//! [`IikoConfig::from_env`] reads `RMS_BASE_URL`, `RMS_LOGIN`, `RMS_PASSWORD`,
//! `TOKEN_STORAGE_PATH`, `REQUEST_TIMEOUT` and `MAX_RETRIES`.
//! [`IikoConfig::load`] additionally reads a `.env` file first.

mod newtypes;

pub use newtypes::{BaseUrl, Login, Password};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default token storage location, relative to the working directory.
pub const DEFAULT_TOKEN_STORAGE_PATH: &str = ".token";

/// Default per-attempt request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of automatic retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Path of the login endpoint, relative to the base URL.
pub const AUTH_PATH: &str = "auth";

/// Path of the logout endpoint, relative to the base URL.
pub const LOGOUT_PATH: &str = "logout";

const TIMEOUT_RANGE: (u64, u64) = (1, 300);
const RETRIES_RANGE: (u64, u64) = (0, 10);

/// Configuration for the iiko RMS API SDK.
///
/// # Thread Safety
///
/// `IikoConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct IikoConfig {
    base_url: BaseUrl,
    login: Login,
    password: Password,
    token_storage_path: PathBuf,
    request_timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    user_agent_prefix: Option<String>,
}

impl IikoConfig {
    /// Creates a new builder for constructing an `IikoConfig`.
    #[must_use]
    pub fn builder() -> IikoConfigBuilder {
        IikoConfigBuilder::new()
    }

    /// Builds a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads a `.env` file from the working directory (if any) and then
    /// builds the configuration from the environment.
    ///
    /// Variables already present in the environment take precedence over
    /// the file.
    ///
    /// # Errors
    ///
    /// Same as [`IikoConfig::from_env`].
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
        }
        Self::from_env()
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str, field: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingRequiredField { field })
        };
        let number = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(name)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidEnvValue { name, value: raw })
                })
                .transpose()
        };

        let mut builder = Self::builder()
            .base_url(BaseUrl::new(required("RMS_BASE_URL", "base_url")?)?)
            .login(Login::new(required("RMS_LOGIN", "login")?)?)
            .password(Password::new(required("RMS_PASSWORD", "password")?)?);

        if let Some(path) = lookup("TOKEN_STORAGE_PATH").filter(|v| !v.is_empty()) {
            builder = builder.token_storage_path(path);
        }
        if let Some(secs) = number("REQUEST_TIMEOUT")? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = number("MAX_RETRIES")? {
            let retries = u32::try_from(retries).map_err(|_| ConfigError::OutOfRange {
                field: "max_retries",
                value: retries,
                min: RETRIES_RANGE.0,
                max: RETRIES_RANGE.1,
            })?;
            builder = builder.max_retries(retries);
        }

        builder.build()
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the RMS login.
    #[must_use]
    pub const fn login(&self) -> &Login {
        &self.login
    }

    /// Returns the RMS password.
    #[must_use]
    pub const fn password(&self) -> &Password {
        &self.password
    }

    /// Returns the path of the persisted session token.
    #[must_use]
    pub fn token_storage_path(&self) -> &Path {
        &self.token_storage_path
    }

    /// Returns the per-attempt request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the number of automatic retries for retryable failures.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the base delay of the exponential retry backoff.
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Full URL of the login endpoint.
    #[must_use]
    pub fn auth_url(&self) -> String {
        self.base_url.join(AUTH_PATH)
    }

    /// Full URL of the logout endpoint.
    #[must_use]
    pub fn logout_url(&self) -> String {
        self.base_url.join(LOGOUT_PATH)
    }

    /// Full URL of an arbitrary endpoint.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        self.base_url.join(path)
    }
}

// Verify IikoConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<IikoConfig>();
};

/// Builder for constructing [`IikoConfig`] instances.
///
/// Required fields are `base_url`, `login` and `password`.
///
/// # Defaults
///
/// - `token_storage_path`: `.token`
/// - `request_timeout`: 30 seconds (allowed 1..=300)
/// - `max_retries`: 3 (allowed 0..=10)
/// - `retry_backoff`: 1 second
/// - `user_agent_prefix`: `None`
#[derive(Debug, Default)]
pub struct IikoConfigBuilder {
    base_url: Option<BaseUrl>,
    login: Option<Login>,
    password: Option<Password>,
    token_storage_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff: Option<Duration>,
    user_agent_prefix: Option<String>,
}

impl IikoConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the RMS login (required).
    #[must_use]
    pub fn login(mut self, login: Login) -> Self {
        self.login = Some(login);
        self
    }

    /// Sets the RMS password (required).
    #[must_use]
    pub fn password(mut self, password: Password) -> Self {
        self.password = Some(password);
        self
    }

    /// Sets where the session token is persisted between runs.
    #[must_use]
    pub fn token_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_storage_path = Some(path.into());
        self
    }

    /// Sets the per-attempt request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the number of automatic retries.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the base delay of the exponential retry backoff.
    ///
    /// The delay doubles on every retry.
    #[must_use]
    pub const fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`IikoConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if a required field is
    /// not set, or [`ConfigError::OutOfRange`] for an unsupported timeout or
    /// retry count.
    pub fn build(self) -> Result<IikoConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;
        let login = self
            .login
            .ok_or(ConfigError::MissingRequiredField { field: "login" })?;
        let password = self
            .password
            .ok_or(ConfigError::MissingRequiredField { field: "password" })?;

        let request_timeout = self
            .request_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        check_range("request_timeout", request_timeout.as_secs(), TIMEOUT_RANGE)?;

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        check_range("max_retries", u64::from(max_retries), RETRIES_RANGE)?;

        Ok(IikoConfig {
            base_url,
            login,
            password,
            token_storage_path: self
                .token_storage_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_STORAGE_PATH)),
            request_timeout,
            max_retries,
            retry_backoff: self.retry_backoff.unwrap_or(Duration::from_secs(1)),
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}

fn check_range(field: &'static str, value: u64, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
