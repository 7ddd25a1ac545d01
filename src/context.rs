/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::ApiResult,
    repo::{ItemRepository, TokenRepository, UserRepository},
    security::CredentialService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
///
/// Configuration is read-only after startup and passed by reference through
/// this context; no component reads ambient global state.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub credentials: Arc<CredentialService>,
    pub users: Arc<UserRepository>,
    pub items: Arc<ItemRepository>,
    pub tokens: Arc<TokenRepository>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        // Run migrations
        db::run_migrations(&db).await?;

        // Test connection
        db::test_connection(&db).await?;

        let credentials = Arc::new(CredentialService::new(&config.authentication)?);
        let users = Arc::new(UserRepository::new(db.clone()));
        let items = Arc::new(ItemRepository::new(db.clone()));
        let tokens = Arc::new(TokenRepository::new(db.clone()));

        // Ensure the configured first superuser exists
        db::bootstrap::ensure_first_superuser(&users, &config.bootstrap).await?;

        // Sweep tokens left over from previous runs
        let purged = tokens.purge_expired().await?;
        if purged > 0 {
            tracing::info!(purged, "Removed expired access tokens");
        }

        Ok(Self {
            config: Arc::new(config),
            db,
            credentials,
            users,
            items,
            tokens,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
