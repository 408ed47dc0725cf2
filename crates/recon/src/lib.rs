//! `crmsync-recon`: contact reconciliation engine.
//!
//! Pure engine crate: receives pre-fetched source-store and CRM contacts,
//! returns classified, filtered, paginated comparisons. Store access goes
//! through the traits in [`source`]; no network or file IO here.

pub mod classify;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod oplog;
pub mod page;
pub mod request;
pub mod service;
pub mod source;
pub mod summary;

pub use engine::run;
pub use error::ReconError;
pub use filter::StatusFilter;
pub use matcher::reconcile;
pub use model::{
    ComparisonSummary, ContactComparison, CrmContact, CrmProperties, Difference, MatchStatus,
    Severity, SourceContact,
};
pub use oplog::{MemoryOpLog, OpLog, OpLogError, OpStatus, SyncDirection, SyncOperation};
pub use request::{Pagination, ReconQuery, ReconRequest, ReconResponse};
pub use service::ReconService;
pub use source::{ContactQuery, CrmPage, CrmStore, SourceError, SourcePage, SourceStore};
