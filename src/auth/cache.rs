use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::store::{CredentialStore, StoreError};

/// Result of a registration attempt that reached the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyExists,
}

/// In-memory username → password map, shared by every connection.
///
/// Logins take the read lock. A registration holds the write lock across the
/// existence check, the store write and the cache insert, so two concurrent
/// registrations of one name cannot both succeed. On a multi-threaded tokio
/// runtime the store write runs under `block_in_place`, letting the worker
/// hand its other tasks off while the insert blocks.
pub struct CredentialCache {
    users: RwLock<HashMap<String, String>>,
    store: Arc<dyn CredentialStore>,
}

impl CredentialCache {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Loads every stored credential into the cache.
    pub fn warm(&self) -> Result<usize, StoreError> {
        let loaded = self.store.load_all()?;
        let mut users = self.users.write();
        users.extend(loaded);
        tracing::info!(users = users.len(), "Credential cache loaded");
        Ok(users.len())
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .read()
            .get(username)
            .is_some_and(|stored| stored == password)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<Registration, StoreError> {
        let mut users = self.users.write();
        if users.contains_key(username) {
            return Ok(Registration::AlreadyExists);
        }

        blocking(|| self.store.insert(username, password))?;
        users.insert(username.to_string(), password.to_string());
        Ok(Registration::Created)
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `block_in_place` panics on a current-thread runtime, so only the
/// multi-threaded flavor gets it.
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
