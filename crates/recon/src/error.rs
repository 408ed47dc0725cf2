use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// `filterStatus` is not `all` or one of the four match statuses.
    InvalidFilterStatus(String),
    /// Neither side could be fetched; there is nothing to reconcile.
    BothSourcesFailed { source: String, crm: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilterStatus(raw) => write!(
                f,
                "invalid filterStatus '{raw}' (expected all, matched, source_only, crm_only or mismatch)"
            ),
            Self::BothSourcesFailed { source, crm } => {
                write!(f, "source store fetch failed: {source}; CRM fetch failed: {crm}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
