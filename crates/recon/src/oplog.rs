//! Sync-status operation log.
//!
//! Every manual status push is recorded through an injected [`OpLog`] so
//! callers can be tested without wall-clock or process-global state.
//! `MemoryOpLog` lives here; the durable SQLite store is in `crmsync-store`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    SourceToCrm,
    CrmToSource,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceToCrm => "source_to_crm",
            Self::CrmToSource => "crm_to_source",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "source_to_crm" => Some(Self::SourceToCrm),
            "crm_to_source" => Some(Self::CrmToSource),
            _ => None,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Pending,
    Completed,
    Failed,
}

impl OpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub id: String,
    /// The identifier on the side being written.
    pub contact_id: String,
    pub direction: SyncDirection,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub status: OpStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncOperation {
    /// A new pending operation with a fresh id.
    pub fn pending(
        contact_id: impl Into<String>,
        direction: SyncDirection,
        field: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact_id.into(),
            direction,
            field: field.into(),
            old_value,
            new_value,
            status: OpStatus::Pending,
            error: None,
            created_at: now,
            completed_at: None,
        }
    }

    pub fn complete(mut self, now: DateTime<Utc>) -> Self {
        self.status = OpStatus::Completed;
        self.error = None;
        self.completed_at = Some(now);
        self
    }

    pub fn fail(mut self, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        self.status = OpStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpLogError(pub String);

impl fmt::Display for OpLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation log error: {}", self.0)
    }
}

impl std::error::Error for OpLogError {}

/// Store of sync operations. `record` upserts by id, so a status
/// transition is recorded by recording the updated operation again.
pub trait OpLog: Send + Sync {
    fn record(&self, op: &SyncOperation) -> Result<(), OpLogError>;
    fn get(&self, id: &str) -> Result<Option<SyncOperation>, OpLogError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<SyncOperation>, OpLogError>;
}

#[derive(Default)]
pub struct MemoryOpLog {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    order: Vec<String>,
    ops: HashMap<String, SyncOperation>,
}

impl MemoryOpLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OpLog for MemoryOpLog {
    fn record(&self, op: &SyncOperation) -> Result<(), OpLogError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| OpLogError("memory log poisoned".into()))?;
        if !inner.ops.contains_key(&op.id) {
            inner.order.push(op.id.clone());
        }
        inner.ops.insert(op.id.clone(), op.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<SyncOperation>, OpLogError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| OpLogError("memory log poisoned".into()))?;
        Ok(inner.ops.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<SyncOperation>, OpLogError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| OpLogError("memory log poisoned".into()))?;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.ops.get(id).cloned())
            .collect())
    }
}
