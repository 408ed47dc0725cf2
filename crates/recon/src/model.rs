use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// A contact row from the source store (the Supabase `contacts` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verification_status: Option<String>,
    /// External CRM identifier; the join key.
    pub hs_object_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A contact object from the CRM contact search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmContact {
    pub id: String,
    pub properties: CrmProperties,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmProperties {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub email_verification_status: Option<String>,
    pub hs_object_id: Option<String>,
}

impl SourceContact {
    /// Build a contact from a raw JSON row. Never fails: missing strings
    /// become `""`, missing statuses and ids become `None`.
    pub fn from_json(row: &serde_json::Value) -> Self {
        Self {
            id: json_string(row.get("id")),
            name: json_string(row.get("name")),
            email: json_string(row.get("email")),
            email_verification_status: json_opt_string(row.get("email_verification_status")),
            hs_object_id: json_opt_string(row.get("hs_object_id")),
            created_at: json_timestamp(row.get("created_at")),
            updated_at: json_timestamp(row.get("updated_at")),
        }
    }

    pub fn join_key(&self) -> Option<&str> {
        self.hs_object_id.as_deref().filter(|k| !k.is_empty())
    }
}

impl CrmContact {
    /// Build a contact from a raw CRM object (`{id, properties, createdAt, updatedAt}`).
    pub fn from_json(obj: &serde_json::Value) -> Self {
        let props = obj.get("properties");
        let prop = |name: &str| props.and_then(|p| p.get(name));

        Self {
            id: json_string(obj.get("id")),
            properties: CrmProperties {
                firstname: json_string(prop("firstname")),
                lastname: json_string(prop("lastname")),
                email: json_string(prop("email")),
                email_verification_status: json_opt_string(prop("email_verification_status")),
                hs_object_id: json_opt_string(prop("hs_object_id")),
            },
            created_at: json_timestamp(obj.get("createdAt")),
            updated_at: json_timestamp(obj.get("updatedAt")),
        }
    }

    /// The mirrored external identifier, falling back to the object id when
    /// the property bag does not carry it.
    pub fn join_key(&self) -> Option<&str> {
        self.properties
            .hs_object_id
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| Some(self.id.as_str()).filter(|k| !k.is_empty()))
    }

    /// `firstname lastname`, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.properties.firstname, self.properties.lastname)
            .trim()
            .to_string()
    }
}

fn json_string(value: Option<&serde_json::Value>) -> String {
    json_opt_string(value).unwrap_or_default()
}

fn json_opt_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_timestamp(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    let raw = value?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    SourceOnly,
    CrmOnly,
    Mismatch,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 4] = [
        MatchStatus::Matched,
        MatchStatus::SourceOnly,
        MatchStatus::CrmOnly,
        MatchStatus::Mismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::SourceOnly => "source_only",
            Self::CrmOnly => "crm_only",
            Self::Mismatch => "mismatch",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub field: String,
    pub source_value: Option<String>,
    pub crm_value: Option<String>,
    pub severity: Severity,
}

/// One reconciled contact. Exactly one side is `None` for the `*_only`
/// statuses; both are present for `matched` and `mismatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactComparison {
    pub id: String,
    pub source_record: Option<SourceContact>,
    pub crm_record: Option<CrmContact>,
    pub match_status: MatchStatus,
    pub differences: Vec<Difference>,
    pub last_sync: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub matched: usize,
    pub source_only: usize,
    pub crm_only: usize,
    pub mismatch: usize,
}

impl ComparisonSummary {
    pub fn total(&self) -> usize {
        self.matched + self.source_only + self.crm_only + self.mismatch
    }

    pub fn count(&self, status: MatchStatus) -> usize {
        match status {
            MatchStatus::Matched => self.matched,
            MatchStatus::SourceOnly => self.source_only,
            MatchStatus::CrmOnly => self.crm_only,
            MatchStatus::Mismatch => self.mismatch,
        }
    }

    /// True when every contact is present on both sides and agrees.
    pub fn is_clean(&self) -> bool {
        self.source_only == 0 && self.crm_only == 0 && self.mismatch == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_from_json_defaults_missing_fields() {
        let c = SourceContact::from_json(&json!({ "id": 42 }));
        assert_eq!(c.id, "42");
        assert_eq!(c.name, "");
        assert_eq!(c.email, "");
        assert_eq!(c.email_verification_status, None);
        assert_eq!(c.hs_object_id, None);
        assert_eq!(c.created_at, None);
    }

    #[test]
    fn source_from_json_reads_supabase_row() {
        let c = SourceContact::from_json(&json!({
            "id": 7,
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "email_verification_status": "verified",
            "hs_object_id": "1001",
            "created_at": "2026-01-15T10:30:00.123456+00:00",
            "updated_at": null
        }));
        assert_eq!(c.join_key(), Some("1001"));
        assert_eq!(c.email_verification_status.as_deref(), Some("verified"));
        assert!(c.created_at.is_some());
        assert!(c.updated_at.is_none());
    }

    #[test]
    fn empty_source_join_key_is_none() {
        let c = SourceContact::from_json(&json!({ "id": 1, "hs_object_id": "" }));
        assert_eq!(c.join_key(), None);
    }

    #[test]
    fn crm_join_key_falls_back_to_id() {
        let c = CrmContact::from_json(&json!({
            "id": "A",
            "properties": { "email": "x@y.com" }
        }));
        assert_eq!(c.join_key(), Some("A"));

        let mirrored = CrmContact::from_json(&json!({
            "id": "A",
            "properties": { "hs_object_id": "B" }
        }));
        assert_eq!(mirrored.join_key(), Some("B"));
    }

    #[test]
    fn crm_full_name_trims_sparse_parts() {
        let c = CrmContact::from_json(&json!({
            "id": "1",
            "properties": { "firstname": "Grace", "lastname": null }
        }));
        assert_eq!(c.full_name(), "Grace");
    }

    #[test]
    fn match_status_parse_round_trips_wire_names() {
        for status in MatchStatus::ALL {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MatchStatus::parse("Matched"), None);
        assert_eq!(MatchStatus::parse("all"), None);
    }

    #[test]
    fn summary_total_and_clean() {
        let s = ComparisonSummary { matched: 3, source_only: 0, crm_only: 0, mismatch: 0 };
        assert_eq!(s.total(), 3);
        assert!(s.is_clean());
        let s = ComparisonSummary { matched: 3, source_only: 1, crm_only: 0, mismatch: 2 };
        assert_eq!(s.total(), 6);
        assert!(!s.is_clean());
    }
}
