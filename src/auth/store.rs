use parking_lot::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid credential table name: {0:?}")]
    InvalidTable(String),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent backing for the credential cache.
pub trait CredentialStore: Send + Sync {
    /// Returns every known username/password pair.
    fn load_all(&self) -> Result<Vec<(String, String)>, StoreError>;

    /// Persists one new pair.
    fn insert(&self, username: &str, password: &str) -> Result<(), StoreError>;
}

/// Keeps credentials in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn with_users<I, U, P>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            users: Mutex::new(
                users
                    .into_iter()
                    .map(|(u, p)| (u.into(), p.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self.users.lock().clone())
    }

    fn insert(&self, username: &str, password: &str) -> Result<(), StoreError> {
        self.users
            .lock()
            .push((username.to_string(), password.to_string()));
        Ok(())
    }
}
