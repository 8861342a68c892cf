//! Configuration error types for the iiko RMS API SDK.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that an
//! invalid setup fails at startup rather than on the first request.
//!
//! # Example
//!
//! ```rust
//! use iiko_api::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("ftp://server.iiko.it/resto/api");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while building an [`IikoConfig`](crate::IikoConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The base URL is not an absolute HTTP(S) URL.
    #[error("Invalid base URL '{url}'. Expected an absolute http:// or https:// URL (e.g., 'https://server.iiko.it/resto/api').")]
    InvalidBaseUrl {
        /// The URL that was provided.
        url: String,
    },

    /// Login cannot be empty.
    #[error("Login cannot be empty. Please provide the RMS user login.")]
    EmptyLogin,

    /// Password cannot be empty.
    #[error("Password cannot be empty. Please provide the RMS user password.")]
    EmptyPassword,

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A numeric setting is outside its allowed range.
    #[error("Value {value} for '{field}' is out of range. Allowed range is {min}..={max}.")]
    OutOfRange {
        /// The setting name.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// An environment variable holds something that is not a number.
    #[error("Environment variable '{name}' must be a non-negative integer, got '{value}'.")]
    InvalidEnvValue {
        /// The variable name.
        name: &'static str,
        /// The raw value found in the environment.
        value: String,
    },
}
