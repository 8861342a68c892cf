//! File-backed persistence of the session token.
//!
//! A token occupies a license slot on the RMS server for as long as it is
//! alive, so it is written to disk and reused by the next process run
//! instead of logging in again. Persistence is best effort: every storage
//! failure is logged and swallowed.
//!
//! The file holds a small JSON record:
//!
//! ```json
//! {
//!   "token": "b3a2f1c0-...",
//!   "created_at": "2026-01-05T09:30:00Z"
//! }
//! ```
//!
//! Concurrent processes sharing one path can race on save/load/clear; the
//! store does not lock the file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A token record as persisted on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// The session token.
    pub token: String,
    /// When the token was obtained. Absent if the file held no readable
    /// timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reads, writes and removes the persisted session token.
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `token` together with the current time.
    ///
    /// I/O and serialization failures are logged, never returned.
    pub fn save(&self, token: &str) {
        let record = StoredToken {
            token: token.to_string(),
            created_at: Some(Utc::now()),
        };

        match self.write(&record) {
            Ok(()) => tracing::debug!("Token saved to {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to save token to {}: {e}", self.path.display()),
        }
    }

    /// Loads the persisted token.
    ///
    /// Returns `None` if the file is missing, unreadable, malformed, or holds
    /// a blank token.
    #[must_use]
    pub fn load(&self) -> Option<StoredToken> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No saved token at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read token from {}: {e}", self.path.display());
                return None;
            }
        };

        let record: StoredToken = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Ignoring malformed token file {}: {e}", self.path.display());
                return None;
            }
        };

        if record.token.trim().is_empty() {
            tracing::debug!("Token file {} holds no token", self.path.display());
            return None;
        }

        tracing::debug!(
            "Token loaded from {} (created {})",
            self.path.display(),
            record
                .created_at
                .map_or_else(|| "at unknown time".to_string(), |t| t.to_rfc3339())
        );
        Some(record)
    }

    /// Removes the persisted token. Does nothing if there is none.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Token removed from {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove token {}: {e}", self.path.display()),
        }
    }

    fn write(&self, record: &StoredToken) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

/// Accepts RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS[.f]` ones
/// (read as UTC). Anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::String(text)) = raw else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}
