//! Local key/value persistence for the last known position and the
//! onboarding profile.
//!
//! The orchestrator only sees the [`LocalStore`] trait. Production uses
//! [`SqliteStore`]; tests swap in [`MemoryStore`].

use crate::error::GuardianError;
use crate::models::{Coordinate, Profile};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

pub const LAST_KNOWN_KEY: &str = "lastKnownLocation";
pub const PROFILE_KEY: &str = "user";

pub trait LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, GuardianError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), GuardianError>;
    fn clear(&mut self, key: &str) -> Result<(), GuardianError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GuardianError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, GuardianError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, GuardianError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl LocalStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, GuardianError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GuardianError> {
        self.conn
            .execute("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)", params![key, value])?;
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), GuardianError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, GuardianError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), GuardianError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<(), GuardianError> {
        self.entries.remove(key);
        Ok(())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read '{}' from local store: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable '{}' entry: {}", key, e);
            None
        }
    }
}

fn save_json<T: serde::Serialize>(store: &mut dyn LocalStore, key: &str, value: &T) -> Result<(), GuardianError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

pub fn load_last_known(store: &dyn LocalStore) -> Option<Coordinate> {
    load_json(store, LAST_KNOWN_KEY)
}

pub fn save_last_known(store: &mut dyn LocalStore, coord: &Coordinate) -> Result<(), GuardianError> {
    save_json(store, LAST_KNOWN_KEY, coord)
}

pub fn load_profile(store: &dyn LocalStore) -> Option<Profile> {
    load_json(store, PROFILE_KEY)
}

pub fn save_profile(store: &mut dyn LocalStore, profile: &Profile) -> Result<(), GuardianError> {
    save_json(store, PROFILE_KEY, profile)
}
