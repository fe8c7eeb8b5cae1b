//! Local stores: users and generated course certificates
//!
//! Both are read through traits so the reconciler can be exercised against
//! in-memory fakes; the SQLite implementations live in the submodules.

pub mod certificates;
pub mod users;

pub use certificates::SqliteCertificateStore;
pub use users::SqliteUserDirectory;

use crate::models::{CertificateRecord, User};
use async_trait::async_trait;
use lms_common::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;

/// Lookup of platform users by username
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns `Ok(None)` when no such user exists
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Read access to generated course certificates
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// All certificates for `username`, in any status
    async fn certificates_for_user(&self, username: &str) -> Result<Vec<CertificateRecord>>;
}

/// Initialize database connection pool and create tables if needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the users and generated_certificates tables if missing
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL DEFAULT '',
            full_name TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generated_certificates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            course_key TEXT NOT NULL,
            certificate_type TEXT NOT NULL,
            status TEXT NOT NULL,
            grade TEXT,
            download_url TEXT,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            UNIQUE (username, course_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (users, generated_certificates)");

    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // Single connection: every connection to :memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}
