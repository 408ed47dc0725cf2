//! Manual verification-status propagation between the two systems.
//!
//! One call copies a single contact's `email_verification_status` to the
//! other side. The attempt is written to the operation log as `pending`
//! before the upstream write and re-recorded as `completed` or `failed`.

use chrono::{DateTime, Utc};

use crmsync_recon::classify::FIELD_VERIFICATION_STATUS;
use crmsync_recon::{OpLog, OpLogError, SourceError, SyncDirection, SyncOperation};

/// A side that can accept a verification-status write.
pub trait StatusWriter: Send + Sync {
    fn write_verification_status(&self, id: &str, value: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub direction: SyncDirection,
    pub source_id: String,
    pub crm_id: String,
    pub value: String,
    /// Value on the target side before the write, when the caller knows it.
    pub previous: Option<String>,
}

impl SyncRequest {
    /// The id on the side being written.
    pub fn target_id(&self) -> &str {
        match self.direction {
            SyncDirection::SourceToCrm => &self.crm_id,
            SyncDirection::CrmToSource => &self.source_id,
        }
    }
}

/// Both writable sides. Either may be absent when unconfigured.
pub struct SyncTargets<'a> {
    pub source: Option<&'a dyn StatusWriter>,
    pub crm: Option<&'a dyn StatusWriter>,
}

/// Push one status and record the outcome. An upstream failure is not an
/// error here: it comes back as a `failed` operation. Only a log write
/// failure is.
pub fn push_status(
    request: &SyncRequest,
    targets: &SyncTargets<'_>,
    log: &dyn OpLog,
) -> Result<SyncOperation, OpLogError> {
    push_status_at(request, targets, log, Utc::now)
}

/// [`push_status`] with an injected clock.
pub fn push_status_at(
    request: &SyncRequest,
    targets: &SyncTargets<'_>,
    log: &dyn OpLog,
    clock: impl Fn() -> DateTime<Utc>,
) -> Result<SyncOperation, OpLogError> {
    let op = SyncOperation::pending(
        request.target_id(),
        request.direction,
        FIELD_VERIFICATION_STATUS,
        request.previous.clone(),
        Some(request.value.clone()),
        clock(),
    );
    log.record(&op)?;

    let (writer, missing) = match request.direction {
        SyncDirection::SourceToCrm => (targets.crm, "HUBSPOT_ACCESS_TOKEN"),
        SyncDirection::CrmToSource => (targets.source, "SUPABASE_URL / SUPABASE_SERVICE_KEY"),
    };

    let result = match writer {
        Some(_) if request.target_id().trim().is_empty() => {
            Err(SourceError::Upstream(400, "empty target contact id".into()))
        }
        Some(w) => w.write_verification_status(request.target_id(), &request.value),
        None => Err(SourceError::NotConfigured(missing.into())),
    };

    let done = match result {
        Ok(()) => {
            log::info!(
                "sync {}: {} {} = {}",
                request.direction,
                request.target_id(),
                FIELD_VERIFICATION_STATUS,
                request.value,
            );
            op.complete(clock())
        }
        Err(e) => {
            log::warn!("sync {} for {} failed: {}", request.direction, request.target_id(), e);
            op.fail(e.to_string(), clock())
        }
    };
    log.record(&done)?;
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsync_recon::{MemoryOpLog, OpStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(String, String)>>,
        fail_with: Option<SourceError>,
    }

    impl StatusWriter for Recorder {
        fn write_verification_status(&self, id: &str, value: &str) -> Result<(), SourceError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.writes.lock().unwrap().push((id.into(), value.into()));
            Ok(())
        }
    }

    fn fixed() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn request(direction: SyncDirection) -> SyncRequest {
        SyncRequest {
            direction,
            source_id: "42".into(),
            crm_id: "1001".into(),
            value: "verified".into(),
            previous: Some("unverified".into()),
        }
    }

    #[test]
    fn source_to_crm_writes_crm_and_completes() {
        let crm = Recorder::default();
        let source = Recorder::default();
        let log = MemoryOpLog::new();
        let targets = SyncTargets {
            source: Some(&source),
            crm: Some(&crm),
        };

        let op = push_status_at(&request(SyncDirection::SourceToCrm), &targets, &log, fixed).unwrap();

        assert_eq!(op.status, OpStatus::Completed);
        assert_eq!(op.contact_id, "1001");
        assert_eq!(op.field, "email_verification_status");
        assert_eq!(op.old_value.as_deref(), Some("unverified"));
        assert_eq!(op.completed_at, Some(fixed()));
        assert_eq!(*crm.writes.lock().unwrap(), vec![("1001".to_string(), "verified".to_string())]);
        assert!(source.writes.lock().unwrap().is_empty());
        assert_eq!(log.get(&op.id).unwrap().unwrap(), op);
    }

    #[test]
    fn crm_to_source_targets_source_id() {
        let source = Recorder::default();
        let log = MemoryOpLog::new();
        let targets = SyncTargets {
            source: Some(&source),
            crm: None,
        };

        let op = push_status_at(&request(SyncDirection::CrmToSource), &targets, &log, fixed).unwrap();
        assert_eq!(op.status, OpStatus::Completed);
        assert_eq!(op.contact_id, "42");
        assert_eq!(source.writes.lock().unwrap().len(), 1);
    }

    #[test]
    fn upstream_failure_is_recorded() {
        let crm = Recorder {
            fail_with: Some(SourceError::Upstream(404, "contact not found".into())),
            ..Default::default()
        };
        let log = MemoryOpLog::new();
        let targets = SyncTargets {
            source: None,
            crm: Some(&crm),
        };

        let op = push_status_at(&request(SyncDirection::SourceToCrm), &targets, &log, fixed).unwrap();
        assert_eq!(op.status, OpStatus::Failed);
        assert!(op.error.as_deref().unwrap().contains("contact not found"));
        assert_eq!(log.list().unwrap().len(), 1);
        assert_eq!(log.list().unwrap()[0].status, OpStatus::Failed);
    }

    #[test]
    fn missing_target_fails_not_configured() {
        let log = MemoryOpLog::new();
        let targets = SyncTargets {
            source: None,
            crm: None,
        };
        let op = push_status_at(&request(SyncDirection::SourceToCrm), &targets, &log, fixed).unwrap();
        assert_eq!(op.status, OpStatus::Failed);
        assert!(op.error.unwrap().starts_with("not configured"));
    }

    #[test]
    fn empty_target_id_is_rejected_without_write() {
        let crm = Recorder::default();
        let log = MemoryOpLog::new();
        let targets = SyncTargets {
            source: None,
            crm: Some(&crm),
        };
        let mut req = request(SyncDirection::SourceToCrm);
        req.crm_id = "  ".into();

        let op = push_status_at(&req, &targets, &log, fixed).unwrap();
        assert_eq!(op.status, OpStatus::Failed);
        assert!(crm.writes.lock().unwrap().is_empty());
    }
}
