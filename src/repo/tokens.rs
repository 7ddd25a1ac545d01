/// Access token repository
///
/// Tracks issued tokens so a user's credentials can be audited and swept.
/// Rows are invalidated by expiry or removed with their owner via the
/// foreign-key cascade.
use crate::db::models::AccessToken;
use crate::error::ApiResult;
use crate::repo::constraint_error;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Token repository
pub struct TokenRepository {
    db: SqlitePool,
}

impl TokenRepository {
    /// Create a new token repository
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a freshly issued token for a user
    pub async fn insert(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> ApiResult<AccessToken> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO access_token (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(|e| constraint_error(e, "access_token"))?;

        Ok(AccessToken {
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Delete every token issued to a user (logout-everywhere)
    pub async fn delete_for_user(&self, user_id: i64) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM access_token WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// Count the tokens currently recorded for a user
    pub async fn count_for_user(&self, user_id: i64) -> ApiResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM access_token WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    /// Remove tokens whose expiry has passed; returns how many were deleted
    pub async fn purge_expired(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM access_token WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
