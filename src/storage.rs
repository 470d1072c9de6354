use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::models::ContactRecord;
use crate::error::StorageError;
use crate::form::ContactSubmission;

pub const CONTACTS_KEY: &str = "paqueteria24_contacts";
pub const READ_NOTIFICATIONS_KEY: &str = "paqueteria24_read_notifications";
pub const SUBMISSIONS_KEY: &str = "paqueteria24_submissions";

pub fn default_data_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("uy", "paqueteria24", "Paqueteria24Dashboard")?;
    Some(proj.data_dir().to_path_buf())
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// JSON blobs under fixed keys.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(data_dir: Option<&Path>) -> Result<Self, StorageError> {
        let dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_data_dir().ok_or(StorageError::NoDataDir)?,
        };
        let path = dir.join("cache.sqlite");
        if let Err(e) = ensure_dir(&path) {
            log::warn!("could not create {}: {e}", dir.display());
        }
        let store = Self { conn: Connection::open(&path)? };
        store.init()?;
        log::debug!("opened store at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
            params![key, json, Utc::now()],
        )?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn save_contacts(&self, contacts: &[ContactRecord]) -> Result<(), StorageError> {
        self.put(CONTACTS_KEY, contacts)
    }

    #[cfg(test)]
    pub fn load_contacts(&self) -> Result<Vec<ContactRecord>, StorageError> {
        Ok(self.get(CONTACTS_KEY)?.unwrap_or_default())
    }

    pub fn save_read_ids(&self, ids: &[String]) -> Result<(), StorageError> {
        self.put(READ_NOTIFICATIONS_KEY, ids)
    }

    pub fn load_read_ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.get(READ_NOTIFICATIONS_KEY)?.unwrap_or_default())
    }

    /// Keep a local copy of a form submission, whatever the server says later.
    /// Returns how many are stored.
    pub fn append_submission(&self, submission: &ContactSubmission) -> Result<usize, StorageError> {
        let mut all = self.load_submissions()?;
        all.push(submission.clone());
        self.put(SUBMISSIONS_KEY, &all)?;
        Ok(all.len())
    }

    pub fn load_submissions(&self) -> Result<Vec<ContactSubmission>, StorageError> {
        Ok(self.get(SUBMISSIONS_KEY)?.unwrap_or_default())
    }
}
