//! SQLite-backed identity collaborator over the `auth_tokens` table.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::identity::IdentityProvider;
use crate::persistence::{now_timestamp, PersistenceError};

/// SQLite implementation of [`IdentityProvider`].
pub struct SqliteAuthRepository {
    pool: SqlitePool,
}

impl SqliteAuthRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue and store a fresh token for `username`.
    pub async fn issue_token(&self, username: &str) -> Result<String, PersistenceError> {
        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO auth_tokens (token, username, created_at) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(username)
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool, PersistenceError> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl IdentityProvider for SqliteAuthRepository {
    async fn validate_token(&self, token: &str) -> Result<bool, PersistenceError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM auth_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn username_for_token(&self, token: &str) -> Result<Option<String>, PersistenceError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT username FROM auth_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(username,)| username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;

    #[tokio::test]
    async fn test_token_lifecycle() {
        let db = Database::new_in_memory().await.unwrap();
        let auth = SqliteAuthRepository::new(db.pool().clone());

        let token = auth.issue_token("alice").await.unwrap();
        assert!(auth.validate_token(&token).await.unwrap());
        assert_eq!(
            auth.username_for_token(&token).await.unwrap().as_deref(),
            Some("alice")
        );

        assert!(auth.revoke_token(&token).await.unwrap());
        assert!(!auth.validate_token(&token).await.unwrap());
        assert_eq!(auth.username_for_token(&token).await.unwrap(), None);
        assert!(!auth.revoke_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let db = Database::new_in_memory().await.unwrap();
        let auth = SqliteAuthRepository::new(db.pool().clone());
        assert!(!auth.validate_token("forged").await.unwrap());
    }
}
