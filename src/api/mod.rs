/// API routes and handlers
pub mod items;
pub mod login;
pub mod middleware;
pub mod users;

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use axum::Router;
use serde::Deserialize;
use validator::Validate;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(login::routes())
        .merge(users::routes())
        .merge(items::routes())
}

/// Offset/limit pagination query parameters
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// Run field validation on a payload before any store access
pub(crate) fn validate_payload<T: Validate>(payload: &T) -> ApiResult<()> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))
}
