/// HTTP server setup and routing
use crate::{
    config::ServiceConfig,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the CORS layer from the configured origins; empty list allows any
fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.service);

    Router::new()
        // Health check endpoint (no auth)
        .route("/health", get(health_check))
        // API routes - merge before with_state
        .merge(crate::api::routes())
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = format!(
        "{}:{}",
        ctx.config.service.hostname, ctx.config.service.port
    );

    info!("Stockroom listening on {}", addr);
    info!("   Service URL: {}", ctx.service_url());

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            AuthConfig, BootstrapConfig, LoggingConfig, ServerConfig, StorageConfig,
        },
        db,
        repo::{ItemRepository, TokenRepository, UserRepository},
        security::CredentialService,
    };
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 0,
                version: "0.1.0".to_string(),
                cors_origins: vec![],
            },
            storage: StorageConfig {
                database: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                jwt_algorithm: "HS256".to_string(),
                access_token_ttl_minutes: 60,
            },
            bootstrap: BootstrapConfig {
                first_superuser_email: "admin@example.com".to_string(),
                first_superuser_password: "adminpassword".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    async fn test_ctx() -> AppContext {
        let pool = db::memory_pool().await;
        let config = test_config();

        let credentials = Arc::new(CredentialService::new(&config.authentication).unwrap());
        let users = Arc::new(UserRepository::new(pool.clone()));
        let items = Arc::new(ItemRepository::new(pool.clone()));
        let tokens = Arc::new(TokenRepository::new(pool.clone()));

        db::bootstrap::ensure_first_superuser(&users, &config.bootstrap)
            .await
            .unwrap();

        AppContext {
            config: Arc::new(config),
            db: pool,
            credentials,
            users,
            items,
            tokens,
        }
    }

    async fn request(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&value).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = request(
            app,
            Method::POST,
            "/api/v1/login/access-token",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_ctx().await);

        let (status, body) = request(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_tokens_are_unauthorized() {
        let app = build_router(test_ctx().await);

        let (status, _) = request(&app, Method::GET, "/api/v1/users/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = request(
            &app,
            Method::GET,
            "/api/v1/users/me",
            Some("not.a.token"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_and_user_lifecycle() {
        let ctx = test_ctx().await;
        let app = build_router(ctx);

        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        // Created user response must not leak credential material
        let (status, created) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["email"], "a@b.com");
        assert!(created.get("password").is_none());
        assert!(created.get("hashed_password").is_none());

        // Duplicate email is a conflict
        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Both users are listed
        let (status, listed) = request(
            &app,
            Method::GET,
            "/api/v1/users",
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 2);

        // The new user can log in and see themselves
        let user_token = login(&app, "a@b.com", "longenough1").await;
        let (status, me) = request(
            &app,
            Method::GET,
            "/api/v1/users/me",
            Some(&user_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@b.com");
        assert_eq!(me["is_superuser"], false);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let app = build_router(test_ctx().await);

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/login/access-token",
            None,
            Some(json!({ "email": "admin@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/login/access-token",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "whatever" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_user_payload_validation() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "not-an-email", "password": "longenough1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "ok@b.com", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_regular_users_cannot_administer() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        let user_token = login(&app, "a@b.com", "longenough1").await;

        let (status, _) = request(&app, Method::GET, "/api/v1/users", Some(&user_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&user_token),
            Some(json!({ "email": "b@b.com", "password": "longenough1" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_item_ownership_enforced() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        for email in ["alice@b.com", "bob@b.com"] {
            request(
                &app,
                Method::POST,
                "/api/v1/users",
                Some(&admin_token),
                Some(json!({ "email": email, "password": "longenough1" })),
            )
            .await;
        }
        let alice_token = login(&app, "alice@b.com", "longenough1").await;
        let bob_token = login(&app, "bob@b.com", "longenough1").await;

        let (status, item) = request(
            &app,
            Method::POST,
            "/api/v1/items",
            Some(&alice_token),
            Some(json!({ "title": "Lamp", "description": "Desk lamp" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let item_id = item["id"].as_i64().unwrap();
        let item_uri = format!("/api/v1/items/{}", item_id);

        // Bob can neither read nor mutate Alice's item
        let (status, _) = request(&app, Method::GET, &item_uri, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = request(
            &app,
            Method::PUT,
            &item_uri,
            Some(&bob_token),
            Some(json!({ "title": "Stolen" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = request(&app, Method::DELETE, &item_uri, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Bob's listing doesn't include it either
        let (status, bob_items) =
            request(&app, Method::GET, "/api/v1/items", Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bob_items.as_array().unwrap().is_empty());

        // Alice updates her item; absent fields stay put
        let (status, updated) = request(
            &app,
            Method::PUT,
            &item_uri,
            Some(&alice_token),
            Some(json!({ "title": "Floor lamp" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Floor lamp");
        assert_eq!(updated["description"], "Desk lamp");

        // The superuser may read and delete any item
        let (status, _) = request(&app, Method::GET, &item_uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = request(&app, Method::DELETE, &item_uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = request(&app, Method::GET, &item_uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_tokens() {
        let ctx = test_ctx().await;
        let tokens = ctx.tokens.clone();
        let users = ctx.users.clone();
        let app = build_router(ctx);

        let admin_token = login(&app, "admin@example.com", "adminpassword").await;
        let (_, created) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        let user_id = created["id"].as_i64().unwrap();

        // Two logins leave two token rows
        login(&app, "a@b.com", "longenough1").await;
        login(&app, "a@b.com", "longenough1").await;
        assert_eq!(tokens.count_for_user(user_id).await.unwrap(), 2);

        let (status, _) = request(
            &app,
            Method::DELETE,
            &format!("/api/v1/users/{}", user_id),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(tokens.count_for_user(user_id).await.unwrap(), 0);
        assert!(users.get_by_email("a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_user_is_forbidden() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        let (_, created) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        let user_id = created["id"].as_i64().unwrap();
        let user_token = login(&app, "a@b.com", "longenough1").await;

        // Deactivate via partial update; email and password stay intact
        let (status, updated) = request(
            &app,
            Method::PUT,
            &format!("/api/v1/users/{}", user_id),
            Some(&admin_token),
            Some(json!({ "is_active": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["email"], "a@b.com");
        assert_eq!(updated["is_active"], false);

        // A valid token over an inactive account is forbidden, not unauthorized
        let (status, _) = request(
            &app,
            Method::GET,
            "/api/v1/users/me",
            Some(&user_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // And a fresh login is refused at the door
        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/login/access-token",
            None,
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_user_can_only_read_self_by_id() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        let (_, created) = request(
            &app,
            Method::POST,
            "/api/v1/users",
            Some(&admin_token),
            Some(json!({ "email": "a@b.com", "password": "longenough1" })),
        )
        .await;
        let user_id = created["id"].as_i64().unwrap();
        let user_token = login(&app, "a@b.com", "longenough1").await;

        let (status, me) = request(
            &app,
            Method::GET,
            &format!("/api/v1/users/{}", user_id),
            Some(&user_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@b.com");

        // Reading someone else requires the superuser flag
        let (status, _) = request(
            &app,
            Method::GET,
            "/api/v1/users/1",
            Some(&user_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_test_token_endpoint() {
        let app = build_router(test_ctx().await);
        let admin_token = login(&app, "admin@example.com", "adminpassword").await;

        let (status, body) = request(
            &app,
            Method::POST,
            "/api/v1/login/test-token",
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "admin@example.com");
        assert_eq!(body["is_superuser"], true);
    }
}
