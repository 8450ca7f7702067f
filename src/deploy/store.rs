//! Relational record of deployments
//!
//! One SQLite table, `deployments`, holding what was started and its last
//! known status. Nothing here talks to the container runtime.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deployments (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    model         TEXT NOT NULL,
    version       TEXT NOT NULL,
    status        TEXT NOT NULL,
    last_updated  TEXT NOT NULL
);
";

/// A row of the `deployments` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub version: String,
    pub status: String,
    pub last_updated: String,
}

impl Deployment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            model: row.get(2)?,
            version: row.get(3)?,
            status: row.get(4)?,
            last_updated: row.get(5)?,
        })
    }
}

/// SQLite-backed deployment table
pub struct DeploymentStore {
    conn: Mutex<Connection>,
}

impl DeploymentStore {
    /// Open (and create if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn list(&self) -> Result<Vec<Deployment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, model, version, status, last_updated FROM deployments ORDER BY id",
        )?;
        let rows = stmt.query_map([], Deployment::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<Deployment>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT id, name, model, version, status, last_updated FROM deployments WHERE id = ?1",
                params![id],
                Deployment::from_row,
            )
            .optional()?)
    }

    pub fn insert(&self, name: &str, model: &str, version: &str, status: &str) -> Result<Deployment> {
        let last_updated = now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO deployments (name, model, version, status, last_updated) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, model, version, status, last_updated],
        )?;
        Ok(Deployment {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            model: model.to_string(),
            version: version.to_string(),
            status: status.to_string(),
            last_updated,
        })
    }

    /// Returns false when no row has this id
    pub fn update_status(&self, id: i64, status: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE deployments SET status = ?1, last_updated = ?2 WHERE id = ?3",
            params![status, now(), id],
        )?;
        Ok(changed > 0)
    }

    /// Returns false when no row has this id
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM deployments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
