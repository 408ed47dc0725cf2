use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::classify::{classify_pair, diff_contacts};
use crate::model::{ContactComparison, CrmContact, MatchStatus, SourceContact};

/// Pair source and CRM contacts by external identifier, stamping matched
/// pairs with the current time.
pub fn reconcile(source: &[SourceContact], crm: &[CrmContact]) -> Vec<ContactComparison> {
    reconcile_at(source, crm, Utc::now())
}

/// Pair source and CRM contacts by external identifier.
///
/// Output order: one comparison per source record in source order, then
/// every unconsumed CRM record in CRM order. The first CRM record with a
/// given key owns it; later duplicates surface as `crm_only`. Empty keys
/// never match.
pub fn reconcile_at(
    source: &[SourceContact],
    crm: &[CrmContact],
    run_at: DateTime<Utc>,
) -> Vec<ContactComparison> {
    let mut crm_by_key: HashMap<&str, usize> = HashMap::with_capacity(crm.len());
    for (idx, contact) in crm.iter().enumerate() {
        if let Some(key) = contact.join_key() {
            crm_by_key.entry(key).or_insert(idx);
        }
    }

    let mut crm_used = vec![false; crm.len()];
    let mut comparisons = Vec::with_capacity(source.len() + crm.len());

    for src in source {
        let found = src.join_key().and_then(|key| crm_by_key.get(key).copied());

        match found {
            Some(idx) => {
                crm_used[idx] = true;
                let crm_contact = &crm[idx];
                let differences = diff_contacts(src, crm_contact);
                comparisons.push(ContactComparison {
                    id: format!("comparison-{}", src.id),
                    source_record: Some(src.clone()),
                    crm_record: Some(crm_contact.clone()),
                    match_status: classify_pair(&differences),
                    differences,
                    last_sync: Some(run_at),
                });
            }
            None => comparisons.push(ContactComparison {
                id: format!("comparison-{}", src.id),
                source_record: Some(src.clone()),
                crm_record: None,
                match_status: MatchStatus::SourceOnly,
                differences: Vec::new(),
                last_sync: None,
            }),
        }
    }

    for (idx, contact) in crm.iter().enumerate() {
        if crm_used[idx] {
            continue;
        }
        comparisons.push(ContactComparison {
            id: format!("comparison-{}", contact.id),
            source_record: None,
            crm_record: Some(contact.clone()),
            match_status: MatchStatus::CrmOnly,
            differences: Vec::new(),
            last_sync: None,
        });
    }

    comparisons
}
