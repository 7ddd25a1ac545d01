/// Credential service: password hashing and signed-token issuance
///
/// Passwords are hashed with Argon2id; the salt is embedded in the PHC
/// string, so the same password hashes to a different digest every call
/// while still verifying. Access tokens are HMAC-signed JWTs carrying the
/// subject user id and an expiry timestamp.
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims encoded into access tokens
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Decoded, validated token contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token together with its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Credential service
pub struct CredentialService {
    secret: String,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl CredentialService {
    /// Create a credential service from the authentication configuration
    pub fn new(config: &AuthConfig) -> ApiResult<Self> {
        Ok(Self {
            secret: config.jwt_secret.clone(),
            algorithm: config.algorithm()?,
            default_ttl: Duration::minutes(config.access_token_ttl_minutes),
        })
    }

    /// Hash a plaintext password with Argon2id and a random salt
    pub fn hash_password(password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(digest.to_string())
    }

    /// Verify a plaintext password against a stored digest
    ///
    /// A malformed digest verifies as false rather than erroring.
    pub fn verify_password(password: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Issue a signed access token for a user id
    ///
    /// Uses the configured default lifetime unless an explicit ttl is given.
    pub fn issue_token(&self, subject_id: i64, ttl: Option<Duration>) -> ApiResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);

        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Parse and validate a signed access token
    ///
    /// Fails if the signature is invalid, the payload is malformed, or the
    /// expiry is in the past.
    pub fn parse_token(&self, token: &str) -> ApiResult<TokenClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::Authentication("Invalid token signature".to_string())
                }
                _ => ApiError::Authentication(format!("Invalid token: {}", e)),
            }
        })?;

        let subject_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::Authentication("Invalid token subject".to_string()))?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| ApiError::Authentication("Invalid token expiry".to_string()))?;

        Ok(TokenClaims {
            subject_id,
            expires_at,
        })
    }
}
