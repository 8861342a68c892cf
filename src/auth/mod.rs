//! Session authentication for the RMS server API.
//!
//! # Overview
//!
//! - [`SessionManager`]: Logs in, caches, validates and releases the token
//! - [`Session`]: The token and when it was obtained
//! - [`SessionState`]: Lifecycle state of the manager
//! - [`TokenStore`]: File persistence of the token between process runs
//!
//! # Licensing
//!
//! Each login may occupy one of a limited number of server license slots
//! until the matching logout. The manager logs in lazily, reuses a persisted
//! token across runs, never retries a login, and always clears its local
//! state on [`SessionManager::logout`].

mod errors;
mod manager;
mod session;
mod token_store;

pub use errors::AuthError;
pub use manager::{SessionManager, VALIDATION_PATH};
pub use session::{Session, SessionState};
pub use token_store::{StoredToken, TokenStore};
