//! Credential handling for the login and registration actions.
//!
//! Usernames and passwords live in a [`CredentialStore`]. They are loaded once
//! at startup into a [`CredentialCache`] that every connection shares.

pub mod cache;
pub mod form;
pub mod sqlite;
pub mod store;

pub use cache::{CredentialCache, Registration};
pub use form::LoginForm;
pub use sqlite::SqliteStore;
pub use store::{CredentialStore, MemoryStore, StoreError};

use crate::config::CredentialConfig;
use std::sync::Arc;

/// Opens the store named by the configuration.
///
/// Without a database path the server keeps credentials in memory only.
pub fn open_store(cfg: &CredentialConfig) -> Result<Arc<dyn CredentialStore>, StoreError> {
    match &cfg.database {
        Some(path) => {
            tracing::info!(database = %path.display(), table = %cfg.table, "Opening credential store");
            Ok(Arc::new(SqliteStore::open(path, &cfg.table)?))
        }
        None => {
            tracing::warn!("No credential database configured, registrations will not persist");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}
