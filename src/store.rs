use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::logging::{log, obj, v_str, Domain, Level};

pub const API_KEY_SLOT: &str = "anthropic_api_key";
pub const LAST_SCAN_SLOT: &str = "last_scan";

/// Small persistent key/value store for the scan credential and timestamps.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, crate::logging::ts_now()],
        )?;
        log(Level::Debug, Domain::Store, "slot_set", obj(&[("key", v_str(key))]));
        Ok(())
    }

    /// Returns whether the slot existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM slots WHERE key = ?1", params![key])?;
        log(Level::Debug, Domain::Store, "slot_removed", obj(&[("key", v_str(key))]));
        Ok(n > 0)
    }
}
