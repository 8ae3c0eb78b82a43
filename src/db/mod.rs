mod models;

pub use models::*;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open the store at `database_url` and bring the schema up to date.
pub async fn init(database_url: &str) -> Result<DbPool> {
    info!("Initializing database at {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Single-connection in-memory store, used by tests and throwaway runs.
///
/// The connection is never recycled: an in-memory database lives exactly as
/// long as the connection that created it.
pub async fn init_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Users and embedded addresses
    execute_sql(pool, include_str!("../../migrations/001_users.sql")).await?;

    // Migration 002: Product catalog
    execute_sql(pool, include_str!("../../migrations/002_products.sql")).await?;

    // Migration 003: Cart lines and wishlist entries
    execute_sql(pool, include_str!("../../migrations/003_cart_wishlist.sql")).await?;

    // Migration 004: Order ledger
    execute_sql(pool, include_str!("../../migrations/004_orders.sql")).await?;

    // Migration 005: One-time codes for password reset / passwordless login
    let has_codes_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='one_time_codes'",
    )
    .fetch_optional(pool)
    .await?;
    if has_codes_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/005_one_time_codes.sql")).await?;
    }

    // Migration 006: Count failed guesses per code
    let has_attempts: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('one_time_codes') WHERE name = 'attempts'",
    )
    .fetch_optional(pool)
    .await?;
    if has_attempts.is_none() {
        execute_sql(pool, include_str!("../../migrations/006_code_attempts.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}
