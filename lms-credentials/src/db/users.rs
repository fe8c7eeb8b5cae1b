//! SQLite-backed user directory

use super::UserDirectory;
use crate::models::User;
use async_trait::async_trait;
use lms_common::Result;
use sqlx::SqlitePool;

/// Reads users from the `users` table
#[derive(Clone)]
pub struct SqliteUserDirectory {
    db: SqlitePool,
}

impl SqliteUserDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a user and return its id
    pub async fn create_user(&self, username: &str, email: &str, full_name: &str) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, full_name, is_active) VALUES (?, ?, ?, 1)",
        )
        .bind(username)
        .bind(email)
        .bind(full_name)
        .execute(&self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, (i64, String, String, String, i64)>(
            "SELECT id, username, email, full_name, is_active FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, username, email, full_name, is_active)| User {
            id,
            username,
            email,
            full_name,
            is_active: is_active != 0,
        }))
    }
}
