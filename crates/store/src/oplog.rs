// Sync operation log backed by SQLite

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crmsync_recon::{OpLog, OpLogError, OpStatus, SyncDirection, SyncOperation};

use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sync_operations (
    id TEXT PRIMARY KEY,
    contact_id TEXT NOT NULL,
    direction TEXT NOT NULL,        -- source_to_crm | crm_to_source
    field TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    status TEXT NOT NULL,           -- pending | completed | failed
    error TEXT,
    created_at TEXT NOT NULL,       -- RFC 3339
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sync_operations_contact ON sync_operations (contact_id);
"#;

const COLUMNS: &str =
    "id, contact_id, direction, field, old_value, new_value, status, error, created_at, completed_at";

pub struct SqliteOpLog {
    conn: Mutex<Connection>,
}

impl SqliteOpLog {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        log::debug!("opened operation log at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert or replace by id. Row order (rowid) is first-insert order.
    pub fn upsert(&self, op: &SyncOperation) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_operations (id, contact_id, direction, field, old_value, new_value,
                                          status, error, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                contact_id = excluded.contact_id,
                direction = excluded.direction,
                field = excluded.field,
                old_value = excluded.old_value,
                new_value = excluded.new_value,
                status = excluded.status,
                error = excluded.error,
                created_at = excluded.created_at,
                completed_at = excluded.completed_at",
            params![
                op.id,
                op.contact_id,
                op.direction.as_str(),
                op.field,
                op.old_value,
                op.new_value,
                op.status.as_str(),
                op.error,
                op.created_at.to_rfc3339(),
                op.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Result<Option<SyncOperation>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sync_operations WHERE id = ?1"),
                params![id],
                RawOperation::from_row,
            )
            .optional()?;
        raw.map(RawOperation::decode).transpose()
    }

    /// Like [`find`](Self::find), but a missing id is an error.
    pub fn require(&self, id: &str) -> Result<SyncOperation, StoreError> {
        self.find(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Newest first.
    pub fn all(&self) -> Result<Vec<SyncOperation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sync_operations ORDER BY rowid DESC"
        ))?;
        let rows = stmt.query_map([], RawOperation::from_row)?;

        let mut ops = Vec::new();
        for raw in rows {
            ops.push(raw?.decode()?);
        }
        Ok(ops)
    }
}

impl OpLog for SqliteOpLog {
    fn record(&self, op: &SyncOperation) -> Result<(), OpLogError> {
        Ok(self.upsert(op)?)
    }

    fn get(&self, id: &str) -> Result<Option<SyncOperation>, OpLogError> {
        Ok(self.find(id)?)
    }

    fn list(&self) -> Result<Vec<SyncOperation>, OpLogError> {
        Ok(self.all()?)
    }
}

/// Row as stored, before enum and timestamp decoding.
struct RawOperation {
    id: String,
    contact_id: String,
    direction: String,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    status: String,
    error: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl RawOperation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            contact_id: row.get(1)?,
            direction: row.get(2)?,
            field: row.get(3)?,
            old_value: row.get(4)?,
            new_value: row.get(5)?,
            status: row.get(6)?,
            error: row.get(7)?,
            created_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<SyncOperation, StoreError> {
        let direction = SyncDirection::parse(&self.direction).ok_or_else(|| {
            StoreError::Serialization(format!("{}: unknown direction '{}'", self.id, self.direction))
        })?;
        let status = OpStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Serialization(format!("{}: unknown status '{}'", self.id, self.status))
        })?;
        let created_at = parse_ts(&self.id, &self.created_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_ts(&self.id, raw))
            .transpose()?;

        Ok(SyncOperation {
            id: self.id,
            contact_id: self.contact_id,
            direction,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            status,
            error: self.error,
            created_at,
            completed_at,
        })
    }
}

fn parse_ts(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("{}: bad timestamp '{}': {}", id, raw, e)))
}
