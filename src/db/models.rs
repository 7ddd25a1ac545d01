/// Database row types
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// User record in the database
///
/// Carries the hashed credential and is never serialized to clients;
/// the API layer exposes `api::users::UserOut` instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item record in the database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Issued access token record
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
