//! Stand-in for a side that could not be constructed.

use crmsync_recon::{
    ContactQuery, CrmPage, CrmStore, SourceError, SourcePage, SourceStore,
};

/// Fails every fetch with the construction error, so an unconfigured side
/// degrades a run instead of aborting it.
#[derive(Debug, Clone)]
pub struct Unavailable(pub SourceError);

impl SourceStore for Unavailable {
    fn fetch_contacts(&self, _query: &ContactQuery) -> Result<SourcePage, SourceError> {
        Err(self.0.clone())
    }
}

impl CrmStore for Unavailable {
    fn fetch_contacts(&self, _query: &ContactQuery) -> Result<CrmPage, SourceError> {
        Err(self.0.clone())
    }
}
