use std::fmt;

use crmsync_recon::OpLogError;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A stored column could not be decoded.
    Serialization(String),
    NotFound(String),
    Io(String),
    /// The connection mutex was poisoned by a panicking writer.
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite error: {}", e),
            StoreError::Serialization(msg) => write!(f, "corrupt operation record: {}", msg),
            StoreError::NotFound(id) => write!(f, "operation not found: {}", id),
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::Poisoned => write!(f, "operation log lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<StoreError> for OpLogError {
    fn from(e: StoreError) -> Self {
        OpLogError(e.to_string())
    }
}
