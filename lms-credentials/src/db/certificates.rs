//! SQLite-backed certificate store

use super::CertificateStore;
use crate::models::{CertificateRecord, CertificateStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_common::Result;
use sqlx::SqlitePool;

/// Reads course certificates from the `generated_certificates` table
#[derive(Clone)]
pub struct SqliteCertificateStore {
    db: SqlitePool,
}

impl SqliteCertificateStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert or update the certificate for (username, course_key)
    pub async fn upsert_certificate(
        &self,
        username: &str,
        course_key: &str,
        certificate_type: &str,
        status: CertificateStatus,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO generated_certificates
                (username, course_key, certificate_type, status, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (username, course_key) DO UPDATE SET
                certificate_type = excluded.certificate_type,
                status = excluded.status,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(username)
        .bind(course_key)
        .bind(certificate_type)
        .bind(status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

type CertificateRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

#[async_trait]
impl CertificateStore for SqliteCertificateStore {
    async fn certificates_for_user(&self, username: &str) -> Result<Vec<CertificateRecord>> {
        let rows = sqlx::query_as::<_, CertificateRow>(
            r#"
            SELECT username, course_key, certificate_type, status, grade, download_url,
                   created_at, modified_at
            FROM generated_certificates
            WHERE username = ?
            ORDER BY id
            "#,
        )
        .bind(username)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(username, course_key, certificate_type, status, grade, download_url, created, modified)| {
                    CertificateRecord {
                        username,
                        course_key,
                        certificate_type,
                        status: CertificateStatus::parse(&status),
                        grade,
                        download_url,
                        created,
                        modified,
                    }
                },
            )
            .collect())
    }
}
