//! Domain types exchanged with the certificate store and remote services
//!
//! All values here are in-memory snapshots of state owned elsewhere; they are
//! only valid for the duration of one reconciliation run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user known to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
}

/// Status of a generated course certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateStatus {
    Downloadable,
    Generating,
    Regenerating,
    NotPassing,
    Unavailable,
    Error,
    Deleted,
    Deleting,
    Restricted,
    Auditing,
    AuditPassing,
    AuditNotPassing,
    Unknown,
}

impl CertificateStatus {
    /// Parse a stored status string; unrecognized values map to `Unknown`
    pub fn parse(value: &str) -> Self {
        match value {
            "downloadable" => Self::Downloadable,
            "generating" => Self::Generating,
            "regenerating" => Self::Regenerating,
            "notpassing" => Self::NotPassing,
            "unavailable" => Self::Unavailable,
            "error" => Self::Error,
            "deleted" => Self::Deleted,
            "deleting" => Self::Deleting,
            "restricted" => Self::Restricted,
            "auditing" => Self::Auditing,
            "audit_passing" => Self::AuditPassing,
            "audit_notpassing" => Self::AuditNotPassing,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Downloadable => "downloadable",
            Self::Generating => "generating",
            Self::Regenerating => "regenerating",
            Self::NotPassing => "notpassing",
            Self::Unavailable => "unavailable",
            Self::Error => "error",
            Self::Deleted => "deleted",
            Self::Deleting => "deleting",
            Self::Restricted => "restricted",
            Self::Auditing => "auditing",
            Self::AuditPassing => "audit_passing",
            Self::AuditNotPassing => "audit_notpassing",
            Self::Unknown => "unknown",
        }
    }

    /// True only when a certificate has actually been issued
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Downloadable)
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A course certificate row from the certificate store
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRecord {
    pub username: String,
    pub course_key: String,
    /// Certificate track ("verified", "honor", "professional", ...)
    pub certificate_type: String,
    pub status: CertificateStatus,
    pub grade: Option<String>,
    pub download_url: Option<String>,
    pub created: chrono::DateTime<chrono::Utc>,
    pub modified: chrono::DateTime<chrono::Utc>,
}

/// A passed course as submitted to the programs completion check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCompletion {
    pub course_id: String,
    pub mode: String,
}

impl From<&CertificateRecord> for CourseCompletion {
    fn from(cert: &CertificateRecord) -> Self {
        Self {
            course_id: cert.course_key.clone(),
            mode: cert.certificate_type.clone(),
        }
    }
}

/// Program identifier as defined by the programs service
///
/// The programs service may use integer or string ids; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgramId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramId::Numeric(id) => write!(f, "{}", id),
            ProgramId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ProgramId {
    fn from(id: i64) -> Self {
        ProgramId::Numeric(id)
    }
}

impl From<&str> for ProgramId {
    fn from(id: &str) -> Self {
        ProgramId::Text(id.to_string())
    }
}

/// Status value meaning a credential has been issued
pub const AWARDED_STATUS: &str = "awarded";

/// Credential payload nested in a user credential record
///
/// Course credentials carry `course_id` instead of `program_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialPayload {
    #[serde(default)]
    pub program_id: Option<ProgramId>,
    #[serde(default)]
    pub credential_id: Option<serde_json::Value>,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// A user credential record from the credentials service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCredential {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: CredentialPayload,
    pub status: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub certificate_url: Option<String>,
}

impl UserCredential {
    /// Program id of an awarded program credential, if this is one
    pub fn awarded_program_id(&self) -> Option<&ProgramId> {
        if self.status != AWARDED_STATUS {
            return None;
        }
        self.credential.program_id.as_ref()
    }
}

/// Body of a credential issuance request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub program_id: ProgramId,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_downloadable_is_passing() {
        assert!(CertificateStatus::Downloadable.is_passing());
        for status in ["generating", "regenerating", "notpassing", "unknown", "audit_passing", "bogus"] {
            assert!(!CertificateStatus::parse(status).is_passing(), "{} should not pass", status);
        }
    }

    #[test]
    fn test_status_round_trips_known_values() {
        assert_eq!(CertificateStatus::parse("audit_notpassing"), CertificateStatus::AuditNotPassing);
        assert_eq!(CertificateStatus::AuditNotPassing.as_str(), "audit_notpassing");
        assert_eq!(CertificateStatus::parse("whatever"), CertificateStatus::Unknown);
    }

    #[test]
    fn test_program_id_accepts_numbers_and_strings() {
        let ids: Vec<ProgramId> = serde_json::from_value(json!([1, "abc-uuid", 3])).unwrap();
        assert_eq!(
            ids,
            vec![ProgramId::Numeric(1), ProgramId::Text("abc-uuid".into()), ProgramId::Numeric(3)]
        );
        assert_eq!(serde_json::to_value(ProgramId::Numeric(5)).unwrap(), json!(5));
        assert_eq!(ProgramId::Text("x".into()).to_string(), "x");
    }

    #[test]
    fn test_completion_serializes_exact_fields() {
        let completion = CourseCompletion {
            course_id: "course-1".into(),
            mode: "verified".into(),
        };
        assert_eq!(
            serde_json::to_value(&completion).unwrap(),
            json!({"course_id": "course-1", "mode": "verified"})
        );
    }

    #[test]
    fn test_awarded_program_id_requires_status_and_program() {
        let records: Vec<UserCredential> = serde_json::from_value(json!([
            {"status": "awarded", "credential": {"program_id": 1}},
            {"status": "awarded", "credential": {"course_id": "course-2"}},
            {"status": "revoked", "credential": {"program_id": 3}},
            {"status": "awarded", "credential": {"credential_id": null, "program_id": null}},
        ]))
        .unwrap();

        let awarded: Vec<_> = records.iter().filter_map(|r| r.awarded_program_id()).collect();
        assert_eq!(awarded, vec![&ProgramId::Numeric(1)]);
    }
}
