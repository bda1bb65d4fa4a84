//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back
//!   to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Storefront migrations live in `crates/storefront/migrations/` and are
//! embedded at compile time. They only create objects in the `storefront`
//! schema; the catalogue tables belong to Supabase and are never touched.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Read the database URL from the environment and connect.
///
/// # Errors
///
/// Returns `MigrationError::MissingEnvVar` if neither variable is set.
pub async fn connect() -> Result<PgPool, MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url(|key| std::env::var(key).ok())?;

    tracing::info!("Connecting to storefront database...");
    Ok(PgPool::connect(&database_url).await?)
}

fn database_url(lookup: impl Fn(&str) -> Option<String>) -> Result<String, MigrationError> {
    lookup("STOREFRONT_DATABASE_URL")
        .or_else(|| lookup("DATABASE_URL"))
        .filter(|url| !url.trim().is_empty())
        .ok_or(MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Run storefront schema migrations.
///
/// # Errors
///
/// Returns `MigrationError::Migration` if a migration fails.
pub async fn storefront(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(pool).await?;
    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// Create the session store's schema and table.
///
/// # Errors
///
/// Returns `MigrationError::Database` if the statements fail.
pub async fn sessions(pool: &PgPool) -> Result<(), MigrationError> {
    tracing::info!("Creating session store table...");
    PostgresStore::new(pool.clone()).migrate().await?;
    tracing::info!("Session store ready");
    Ok(())
}
