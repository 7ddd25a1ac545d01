/// Stockroom - user and item management REST service
///
/// A small data-access backend: user and item CRUD over SQLite, with
/// password hashing, signed access tokens, and per-request access control.

mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod repo;
mod security;
mod server;

use config::ServerConfig;
use context::AppContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  ============================================
    Stockroom - user & item service v{}
  ============================================
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
