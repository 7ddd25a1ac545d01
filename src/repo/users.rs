/// User repository
///
/// Extends the generic CRUD contract with email lookup and credential
/// handling: plaintext passwords are hashed before row construction and
/// never persisted.
use crate::db::models::User;
use crate::error::ApiResult;
use crate::repo::{constraint_error, Repository};
use crate::security::CredentialService;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

fn default_true() -> bool {
    true
}

/// Input model for creating a user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Input model for updating a user; absent fields are left untouched
///
/// A replacement password is re-hashed only when explicitly supplied and
/// non-empty; an empty string leaves the stored credential as is.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// User repository
pub struct UserRepository {
    db: SqlitePool,
}

const USER_COLUMNS: &str =
    "id, email, hashed_password, full_name, is_active, is_superuser, created_at, updated_at";

impl UserRepository {
    /// Create a new user repository
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Look up a user by their unique email
    pub async fn get_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM user WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Verify an email/password pair against the stored credential
    ///
    /// Returns the matching user, or `None` on either a missing user or a
    /// password mismatch without revealing which factor failed.
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<Option<User>> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        if CredentialService::verify_password(password, &user.hashed_password) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl Repository for UserRepository {
    type Entity = User;
    type Create = UserCreate;
    type Update = UserUpdate;

    async fn get(&self, id: i64) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM user WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn list(&self, skip: i64, limit: i64) -> ApiResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM user LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn create(&self, input: UserCreate) -> ApiResult<User> {
        let hashed_password = CredentialService::hash_password(&input.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO user (email, hashed_password, full_name, is_active, is_superuser, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&input.email)
        .bind(&hashed_password)
        .bind(&input.full_name)
        .bind(input.is_active)
        .bind(input.is_superuser)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| constraint_error(e, "user"))?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: input.email,
            hashed_password,
            full_name: input.full_name,
            is_active: input.is_active,
            is_superuser: input.is_superuser,
            created_at: now,
            updated_at: now,
        })
    }

    async fn update(&self, existing: User, input: UserUpdate) -> ApiResult<User> {
        let mut user = existing;

        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(full_name) = input.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        if let Some(is_superuser) = input.is_superuser {
            user.is_superuser = is_superuser;
        }
        // Re-hash only when a non-empty replacement password was supplied
        if let Some(password) = input.password.as_deref() {
            if !password.is_empty() {
                user.hashed_password = CredentialService::hash_password(password)?;
            }
        }
        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE user SET email = ?1, hashed_password = ?2, full_name = ?3,
                    is_active = ?4, is_superuser = ?5, updated_at = ?6
             WHERE id = ?7",
        )
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.db)
        .await
        .map_err(|e| constraint_error(e, "user"))?;

        Ok(user)
    }

    async fn remove(&self, id: i64) -> ApiResult<Option<User>> {
        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM user WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        // Dependent item and access_token rows go with the user
        sqlx::query("DELETE FROM user WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(user))
    }
}
