/// Configuration management for Stockroom
use crate::error::{ApiError, ApiResult};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// JWT signing algorithm name, e.g. "HS256"
    pub jwt_algorithm: String,
    /// Default access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
}

/// First-superuser bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub first_superuser_email: String,
    pub first_superuser_password: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AuthConfig {
    /// Resolve the configured algorithm name to a jsonwebtoken algorithm
    pub fn algorithm(&self) -> ApiResult<Algorithm> {
        self.jwt_algorithm
            .parse::<Algorithm>()
            .map_err(|_| {
                ApiError::Validation(format!(
                    "Unknown JWT algorithm: {}",
                    self.jwt_algorithm
                ))
            })
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("STOCKROOM_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("STOCKROOM_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let version = env::var("STOCKROOM_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        // Parse allowed origins from comma-separated list
        let cors_origins = env::var("STOCKROOM_CORS_ORIGINS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let database = env::var("STOCKROOM_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/stockroom.sqlite"));

        let jwt_secret = env::var("STOCKROOM_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let jwt_algorithm =
            env::var("STOCKROOM_JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
        let access_token_ttl_minutes = env::var("STOCKROOM_ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or_else(|_| "10080".to_string()) // one week
            .parse()
            .unwrap_or(10080);

        let first_superuser_email = env::var("STOCKROOM_FIRST_SUPERUSER_EMAIL")
            .map_err(|_| ApiError::Validation("First superuser email required".to_string()))?;
        let first_superuser_password = env::var("STOCKROOM_FIRST_SUPERUSER_PASSWORD")
            .map_err(|_| ApiError::Validation("First superuser password required".to_string()))?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                cors_origins,
            },
            storage: StorageConfig { database },
            authentication: AuthConfig {
                jwt_secret,
                jwt_algorithm,
                access_token_ttl_minutes,
            },
            bootstrap: BootstrapConfig {
                first_superuser_email,
                first_superuser_password,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        // Only shared-secret algorithms make sense with a string secret
        match self.authentication.algorithm()? {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {}
            other => {
                return Err(ApiError::Validation(format!(
                    "JWT algorithm {:?} requires a key pair; use HS256/HS384/HS512",
                    other
                )));
            }
        }

        if self.authentication.access_token_ttl_minutes <= 0 {
            return Err(ApiError::Validation(
                "Access token TTL must be positive".to_string(),
            ));
        }

        if self.bootstrap.first_superuser_password.len() < 8 {
            return Err(ApiError::Validation(
                "First superuser password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}
