/// Authentication extractors
///
/// A request's credential moves through a fixed sequence: bearer token
/// extracted from the Authorization header, parsed and validated by the
/// credential service, subject resolved through the user repository, then
/// checked against the active (and optionally superuser) flags. Any failure
/// before resolution is 401; a resolved but inactive or under-privileged
/// principal is 403.
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::models::User,
    error::ApiError,
    repo::Repository,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// The principal resolved from the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Extract bearer token from Authorization header
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Missing authorization header".to_string()))?;

        // Validate signature and expiry
        let claims = state.credentials.parse_token(&token)?;

        // Resolve the subject to a stored user
        let user = state
            .users
            .get(claims.subject_id)
            .await?
            .ok_or_else(|| {
                ApiError::Authentication("Could not validate credentials".to_string())
            })?;

        Ok(CurrentUser(user))
    }
}

/// A resolved principal whose account is active
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for ActiveUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_active {
            return Err(ApiError::Authorization("Inactive user".to_string()));
        }

        Ok(ActiveUser(user))
    }
}

/// An active principal with the superuser flag set
#[derive(Debug, Clone)]
pub struct Superuser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for Superuser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let ActiveUser(user) = ActiveUser::from_request_parts(parts, state).await?;

        if !user.is_superuser {
            tracing::debug!(user_id = user.id, "Superuser access denied");
            return Err(ApiError::Authorization(
                "The user doesn't have enough privileges".to_string(),
            ));
        }

        Ok(Superuser(user))
    }
}
