/// User endpoints
use crate::{
    api::{validate_payload, Pagination},
    auth::{ActiveUser, Superuser},
    context::AppContext,
    db::models::User,
    error::{ApiError, ApiResult},
    repo::users::{UserCreate, UserUpdate},
    repo::Repository,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Client-facing user view; the hashed credential never leaves the store
#[derive(Debug, Clone, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Self-service update payload; privilege flags are not client-settable
#[derive(Debug, Deserialize, Validate)]
pub struct UserSelfUpdate {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
}

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/users", get(list_users).post(create_user))
        .route("/api/v1/users/me", get(read_me).put(update_me))
        .route(
            "/api/v1/users/:user_id",
            get(read_user).put(update_user).delete(delete_user),
        )
}

/// List users, paginated (superuser only)
async fn list_users(
    State(ctx): State<AppContext>,
    Superuser(_): Superuser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<UserOut>>> {
    let users = ctx.users.list(page.skip, page.limit).await?;

    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

/// Create a user (superuser only)
async fn create_user(
    State(ctx): State<AppContext>,
    Superuser(_): Superuser,
    Json(payload): Json<UserCreate>,
) -> ApiResult<Json<UserOut>> {
    validate_payload(&payload)?;

    if ctx.users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "The user with this email already exists in the system".to_string(),
        ));
    }

    let user = ctx.users.create(payload).await?;

    tracing::info!(user_id = user.id, "Created user");

    Ok(Json(user.into()))
}

/// Return the requesting user
async fn read_me(ActiveUser(user): ActiveUser) -> Json<UserOut> {
    Json(user.into())
}

/// Update the requesting user's own profile
async fn update_me(
    State(ctx): State<AppContext>,
    ActiveUser(user): ActiveUser,
    Json(payload): Json<UserSelfUpdate>,
) -> ApiResult<Json<UserOut>> {
    validate_payload(&payload)?;

    let update = UserUpdate {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name,
        is_active: None,
        is_superuser: None,
    };

    let updated = ctx.users.update(user, update).await?;

    Ok(Json(updated.into()))
}

/// Fetch a user by id; regular users may only fetch themselves
async fn read_user(
    State(ctx): State<AppContext>,
    ActiveUser(requester): ActiveUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserOut>> {
    if requester.id != user_id && !requester.is_superuser {
        return Err(ApiError::Authorization(
            "The user doesn't have enough privileges".to_string(),
        ));
    }

    let user = ctx
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Update a user by id (superuser only)
async fn update_user(
    State(ctx): State<AppContext>,
    Superuser(_): Superuser,
    Path(user_id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<Json<UserOut>> {
    validate_payload(&payload)?;

    let existing = ctx
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let updated = ctx.users.update(existing, payload).await?;

    Ok(Json(updated.into()))
}

/// Delete a user by id (superuser only); owned rows cascade
async fn delete_user(
    State(ctx): State<AppContext>,
    Superuser(_): Superuser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserOut>> {
    let removed = ctx
        .users
        .remove(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id, "Deleted user");

    Ok(Json(removed.into()))
}
