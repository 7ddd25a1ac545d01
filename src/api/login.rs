/// Login endpoints: token issuance and verification
use crate::{
    api::users::UserOut,
    api::validate_payload,
    auth::ActiveUser,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Issued token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Build login routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/login/access-token", post(access_token))
        .route("/api/v1/login/test-token", post(test_token))
}

/// Verify credentials and issue an access token
async fn access_token(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    validate_payload(&req)?;

    // A missing user and a wrong password are indistinguishable to the caller
    let user = ctx
        .users
        .authenticate(&req.email, &req.password)
        .await?
        .ok_or_else(|| ApiError::Authentication("Incorrect email or password".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Authorization("Inactive user".to_string()));
    }

    let issued = ctx.credentials.issue_token(user.id, None)?;
    ctx.tokens
        .insert(&issued.token, user.id, issued.expires_at)
        .await?;

    tracing::info!(user_id = user.id, "Issued access token");

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
    }))
}

/// Return the principal behind the presented token
async fn test_token(ActiveUser(user): ActiveUser) -> Json<UserOut> {
    Json(user.into())
}
