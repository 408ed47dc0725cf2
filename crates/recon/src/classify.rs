use crate::model::{CrmContact, Difference, MatchStatus, Severity, SourceContact};

pub const FIELD_VERIFICATION_STATUS: &str = "email_verification_status";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_NAME: &str = "name";

/// Field-level differences between two paired contacts.
///
/// Every rule is evaluated; the result is ordered verification status,
/// email, name.
pub fn diff_contacts(source: &SourceContact, crm: &CrmContact) -> Vec<Difference> {
    let mut diffs = Vec::new();

    if source.email_verification_status != crm.properties.email_verification_status {
        diffs.push(Difference {
            field: FIELD_VERIFICATION_STATUS.into(),
            source_value: source.email_verification_status.clone(),
            crm_value: crm.properties.email_verification_status.clone(),
            severity: Severity::Warning,
        });
    }

    if source.email != crm.properties.email {
        diffs.push(Difference {
            field: FIELD_EMAIL.into(),
            source_value: Some(source.email.clone()),
            crm_value: Some(crm.properties.email.clone()),
            severity: Severity::Error,
        });
    }

    // Sparse CRM names are common; only compare when both sides have one.
    let source_name = source.name.trim();
    let crm_name = crm.full_name();
    if !source_name.is_empty()
        && !crm_name.is_empty()
        && source_name.to_lowercase() != crm_name.to_lowercase()
    {
        diffs.push(Difference {
            field: FIELD_NAME.into(),
            source_value: Some(source_name.to_string()),
            crm_value: Some(crm_name),
            severity: Severity::Info,
        });
    }

    diffs
}

/// Status for a pair present on both sides.
pub fn classify_pair(differences: &[Difference]) -> MatchStatus {
    if differences.is_empty() {
        MatchStatus::Matched
    } else {
        MatchStatus::Mismatch
    }
}
