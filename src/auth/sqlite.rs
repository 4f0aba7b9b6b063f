//! SQLite-backed credential store.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, params};

use super::store::{CredentialStore, StoreError};

/// Stores credentials in a `(username, passwd)` table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?, table)
    }

    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        // The table name is interpolated into SQL, so it must be a plain identifier.
        let valid = !table.is_empty()
            && !table.starts_with(|c: char| c.is_ascii_digit())
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StoreError::InvalidTable(table.to_string()));
        }

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    username TEXT PRIMARY KEY NOT NULL,
                    passwd   TEXT NOT NULL
                )"
            ),
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }
}

impl CredentialStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT username, passwd FROM {}", self.table))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(rows)
    }

    fn insert(&self, username: &str, password: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            &format!("INSERT INTO {} (username, passwd) VALUES (?1, ?2)", self.table),
            params![username, password],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_load() {
        let store = SqliteStore::open_in_memory("user").unwrap();
        store.insert("alice", "secret").unwrap();
        store.insert("bob", "hunter2").unwrap();

        let mut users = store.load_all().unwrap();
        users.sort();
        assert_eq!(
            users,
            vec![
                ("alice".to_string(), "secret".to_string()),
                ("bob".to_string(), "hunter2".to_string()),
            ]
        );
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let store = SqliteStore::open_in_memory("user").unwrap();
        store.insert("alice", "secret").unwrap();
        assert!(matches!(
            store.insert("alice", "other"),
            Err(StoreError::Database(_))
        ));
    }

    #[test]
    fn table_name_must_be_identifier() {
        assert!(matches!(
            SqliteStore::open_in_memory("user; DROP TABLE x"),
            Err(StoreError::InvalidTable(_))
        ));
    }
}
