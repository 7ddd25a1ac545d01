/// First-superuser bootstrap
///
/// Runs once at startup: if no user exists with the configured bootstrap
/// email, one is created with the superuser flag set.
use crate::config::BootstrapConfig;
use crate::error::ApiResult;
use crate::repo::users::{UserCreate, UserRepository};
use crate::repo::Repository;

/// Ensure the configured first superuser exists
pub async fn ensure_first_superuser(
    users: &UserRepository,
    config: &BootstrapConfig,
) -> ApiResult<()> {
    if users
        .get_by_email(&config.first_superuser_email)
        .await?
        .is_some()
    {
        tracing::debug!(
            email = %config.first_superuser_email,
            "First superuser already present"
        );
        return Ok(());
    }

    let created = users
        .create(UserCreate {
            email: config.first_superuser_email.clone(),
            password: config.first_superuser_password.clone(),
            full_name: Some("Superuser Admin".to_string()),
            is_active: true,
            is_superuser: true,
        })
        .await?;

    tracing::info!(
        user_id = created.id,
        email = %created.email,
        "Created first superuser"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_bootstrap() -> BootstrapConfig {
        BootstrapConfig {
            first_superuser_email: "admin@example.com".to_string(),
            first_superuser_password: "changethis".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_superuser_once() {
        let pool = db::memory_pool().await;
        let users = UserRepository::new(pool);
        let config = test_bootstrap();

        ensure_first_superuser(&users, &config).await.unwrap();
        // Second run is a no-op rather than a conflict
        ensure_first_superuser(&users, &config).await.unwrap();

        let admin = users
            .get_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_superuser);
        assert!(admin.is_active);
        assert_eq!(users.list(0, 100).await.unwrap().len(), 1);
    }
}
