//! Program credential reconciliation
//!
//! Given a username, works out which programs the user has newly completed
//! and asks the credentials service to issue a credential for each one that
//! has not already been awarded:
//!
//! 1. Look up the user (missing user aborts the run)
//! 2. Collect passing course certificates as `{course_id, mode}`
//! 3. Ask the programs service which programs those completions satisfy
//! 4. Collect program ids the user already holds an awarded credential for
//! 5. `new = completed − awarded` (set difference)
//! 6. Issue one credential per new program, authenticated as the service
//!    identity; each issuance is independent of the others
//!
//! Configuration is snapshotted once at the start of a run.

use crate::clients::ClientFactory;
use crate::config::{CredentialsApiConfig, ProgramsApiConfig, ServiceApiConfig, ServiceIdentity};
use crate::db::{CertificateStore, UserDirectory};
use crate::error::ReconcileError;
use crate::models::{CertificateRecord, CourseCompletion, CredentialRequest, ProgramId, UserCredential};
use crate::token::{TokenIssuer, TokenSubject};
use async_trait::async_trait;
use lms_common::ConfigModel;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Passing certificates reduced to the completion-check payload
pub fn completed_courses(certificates: &[CertificateRecord]) -> Vec<CourseCompletion> {
    certificates
        .iter()
        .filter(|cert| cert.status.is_passing())
        .map(CourseCompletion::from)
        .collect()
}

/// Program ids of awarded program credentials
///
/// Records without a program id (course credentials, malformed payloads)
/// and records in any other status are skipped.
pub fn awarded_program_ids(credentials: &[UserCredential]) -> Vec<ProgramId> {
    credentials
        .iter()
        .filter_map(UserCredential::awarded_program_id)
        .cloned()
        .collect()
}

/// `completed − awarded` with duplicates collapsed, in ascending id order
pub fn new_program_ids(completed: &[ProgramId], awarded: &[ProgramId]) -> Vec<ProgramId> {
    let awarded: BTreeSet<&ProgramId> = awarded.iter().collect();
    completed
        .iter()
        .filter(|id| !awarded.contains(id))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwardReport {
    pub username: String,
    /// Set when the run did nothing because issuance is switched off
    pub skipped: Option<String>,
    pub completed_courses: Vec<CourseCompletion>,
    pub completed_programs: Vec<ProgramId>,
    pub already_awarded: Vec<ProgramId>,
    pub awarded: Vec<ProgramId>,
    /// Programs whose issuance call failed, with the error text
    pub failed: Vec<(ProgramId, String)>,
}

impl AwardReport {
    fn skipped_run(username: &str, reason: impl Into<String>) -> Self {
        Self {
            username: username.to_string(),
            skipped: Some(reason.into()),
            ..Default::default()
        }
    }

    /// True when every attempted issuance succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Anything that can run a reconciliation for one username
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, username: &str) -> Result<AwardReport, ReconcileError>;
}

/// Reconciles one user's program completions against issued credentials
pub struct ProgramCertificateAwarder {
    users: Arc<dyn UserDirectory>,
    certificates: Arc<dyn CertificateStore>,
    tokens: Arc<dyn TokenIssuer>,
    clients: Arc<dyn ClientFactory>,
    programs_config: Arc<ConfigModel<ProgramsApiConfig>>,
    credentials_config: Arc<ConfigModel<CredentialsApiConfig>>,
    service_identity: ServiceIdentity,
}

impl ProgramCertificateAwarder {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        certificates: Arc<dyn CertificateStore>,
        tokens: Arc<dyn TokenIssuer>,
        clients: Arc<dyn ClientFactory>,
        programs_config: Arc<ConfigModel<ProgramsApiConfig>>,
        credentials_config: Arc<ConfigModel<CredentialsApiConfig>>,
        service_identity: ServiceIdentity,
    ) -> Self {
        Self {
            users,
            certificates,
            tokens,
            clients,
            programs_config,
            credentials_config,
            service_identity,
        }
    }

    pub fn programs_config(&self) -> &Arc<ConfigModel<ProgramsApiConfig>> {
        &self.programs_config
    }

    pub fn credentials_config(&self) -> &Arc<ConfigModel<CredentialsApiConfig>> {
        &self.credentials_config
    }

    /// Run one reconciliation for `username`
    ///
    /// Remote failures while reading (completion check, credential listing)
    /// abort the run. Failures while issuing are collected in the report and
    /// do not stop the remaining issuances.
    pub async fn award_program_certificates(&self, username: &str) -> Result<AwardReport, ReconcileError> {
        let student = self
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| ReconcileError::UserNotFound(username.to_string()))?;

        let programs = self.programs_config.current();
        let credentials = self.credentials_config.current();

        if !programs.enabled || !programs.value.enable_certification {
            warn!(username, "Program certification is disabled, skipping credential reconciliation");
            return Ok(AwardReport::skipped_run(username, "program certification disabled"));
        }
        if !credentials.enabled || !credentials.value.enable_learner_issuance {
            warn!(username, "Learner credential issuance is disabled, skipping credential reconciliation");
            return Ok(AwardReport::skipped_run(username, "learner issuance disabled"));
        }

        let student_subject = TokenSubject::from(&student);

        // Course runs for which the user has earned a certificate
        let certificates = self.certificates.certificates_for_user(&student.username).await?;
        let course_completions = completed_courses(&certificates);

        // Programs satisfied by those completions
        let token = self
            .tokens
            .get_id_token(&student_subject, ProgramsApiConfig::OAUTH2_CLIENT_NAME)?;
        let programs_client = self.clients.programs_client(&programs.value, token)?;
        let completed_programs = programs_client.check_completion(&course_completions).await?;

        // Programs already credentialed
        let token = self
            .tokens
            .get_id_token(&student_subject, CredentialsApiConfig::OAUTH2_CLIENT_NAME)?;
        let reader = self.clients.credentials_client(&credentials.value, token)?;
        let existing = reader.list_credentials(&student.username).await?;
        let already_awarded = awarded_program_ids(&existing);

        let new_programs = new_program_ids(&completed_programs, &already_awarded);

        let mut report = AwardReport {
            username: username.to_string(),
            skipped: None,
            completed_courses: course_completions,
            completed_programs,
            already_awarded,
            awarded: Vec::new(),
            failed: Vec::new(),
        };

        if new_programs.is_empty() {
            debug!(username, "No new program credentials to issue");
            return Ok(report);
        }

        debug!(
            username,
            programs = ?new_programs,
            "Generating new program certificates"
        );

        let service_subject = TokenSubject::from(&self.service_identity);
        let token = self
            .tokens
            .get_id_token(&service_subject, CredentialsApiConfig::OAUTH2_CLIENT_NAME)?;
        let issuer = self.clients.credentials_client(&credentials.value, token)?;

        for program_id in new_programs {
            debug!(
                username,
                program_id = %program_id,
                "Calling credentials service to issue certificate"
            );
            let request = CredentialRequest {
                program_id: program_id.clone(),
                username: student.username.clone(),
            };
            match issuer.issue_credential(&request).await {
                Ok(()) => {
                    info!(username, program_id = %program_id, "Program credential issued");
                    report.awarded.push(program_id);
                }
                Err(e) => {
                    error!(
                        username,
                        program_id = %program_id,
                        error = %e,
                        "Failed to issue program credential"
                    );
                    report.failed.push((program_id, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl Reconciler for ProgramCertificateAwarder {
    async fn reconcile(&self, username: &str) -> Result<AwardReport, ReconcileError> {
        self.award_program_certificates(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificateStatus, CredentialPayload};
    use chrono::Utc;

    fn cert(course_key: &str, certificate_type: &str, status: &str) -> CertificateRecord {
        CertificateRecord {
            username: "dummy-username".to_string(),
            course_key: course_key.to_string(),
            certificate_type: certificate_type.to_string(),
            status: CertificateStatus::parse(status),
            grade: Some("0.98".to_string()),
            download_url: Some("http://www.example.com/cert.pdf".to_string()),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    fn credential(status: &str, program_id: Option<i64>) -> UserCredential {
        UserCredential {
            id: Some(1),
            username: Some("dummy-username".to_string()),
            credential: CredentialPayload {
                program_id: program_id.map(ProgramId::Numeric),
                credential_id: None,
                course_id: None,
            },
            status: status.to_string(),
            uuid: None,
            certificate_url: None,
        }
    }

    fn ids(values: &[i64]) -> Vec<ProgramId> {
        values.iter().copied().map(ProgramId::Numeric).collect()
    }

    #[test]
    fn test_completed_courses_keeps_only_passing() {
        let certs = vec![
            cert("downloadable-course", "verified", "downloadable"),
            cert("generating-course", "prof-ed", "generating"),
            cert("unknown-course", "honor", "unknown"),
            cert("failed-course", "honor", "notpassing"),
        ];
        assert_eq!(
            completed_courses(&certs),
            vec![CourseCompletion {
                course_id: "downloadable-course".to_string(),
                mode: "verified".to_string(),
            }]
        );
    }

    #[test]
    fn test_awarded_program_ids_filters_status_and_payload() {
        let mut course_credential = credential("awarded", None);
        course_credential.credential.course_id = Some("course-2".to_string());
        let records = vec![
            credential("awarded", Some(1)),
            course_credential,
            credential("revoked", Some(3)),
        ];
        assert_eq!(awarded_program_ids(&records), ids(&[1]));
    }

    #[test]
    fn test_new_program_ids_set_difference() {
        assert_eq!(new_program_ids(&ids(&[1, 2, 3]), &ids(&[1])), ids(&[2, 3]));
        assert_eq!(new_program_ids(&ids(&[1, 2, 3]), &[]), ids(&[1, 2, 3]));
        assert!(new_program_ids(&ids(&[1, 2, 3]), &ids(&[1, 2, 3])).is_empty());
        assert!(new_program_ids(&[], &ids(&[4])).is_empty());
        assert!(new_program_ids(&[], &[]).is_empty());
    }

    #[test]
    fn test_new_program_ids_collapses_duplicates() {
        assert_eq!(new_program_ids(&ids(&[3, 2, 3, 2]), &ids(&[9])), ids(&[2, 3]));
    }
}
