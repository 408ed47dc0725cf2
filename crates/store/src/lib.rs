//! `crmsync-store`: durable operation log.

pub mod error;
pub mod oplog;

pub use error::StoreError;
pub use oplog::SqliteOpLog;
