//! Short-lived numeric codes for password reset and passwordless login.
//!
//! One live code per e-mail. Requesting a new code overwrites the previous
//! one, and a code is deleted the moment it is consumed or after
//! [`MAX_ATTEMPTS`] wrong guesses.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::db::{now_timestamp, DbPool};
use crate::error::{AuthError, Result};

/// Wrong guesses tolerated before the live code is discarded
pub const MAX_ATTEMPTS: i64 = 5;

/// Six decimal digits, never with a leading zero
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Store a fresh code for `email`, valid until `now + ttl`.
pub async fn issue(db: &DbPool, email: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
    let code = generate_code();
    let expires_at = (now + ttl).to_rfc3339_opts(SecondsFormat::Millis, true);

    sqlx::query(
        r#"
        INSERT INTO one_time_codes (email, code, expires_at, attempts, created_at)
        VALUES (?, ?, ?, 0, ?)
        ON CONFLICT(email) DO UPDATE SET
            code = excluded.code,
            expires_at = excluded.expires_at,
            attempts = 0,
            created_at = excluded.created_at
        "#,
    )
    .bind(email)
    .bind(&code)
    .bind(&expires_at)
    .bind(now_timestamp())
    .execute(db)
    .await?;

    Ok(code)
}

/// Accept `code` for `email` exactly once. A code is valid while
/// `now < expires_at` and fewer than [`MAX_ATTEMPTS`] wrong guesses were made.
pub async fn consume(db: &DbPool, email: &str, code: &str, now: DateTime<Utc>) -> Result<()> {
    let record: Option<(String, String)> =
        sqlx::query_as("SELECT code, expires_at FROM one_time_codes WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;

    let (stored, expires_at) = record.ok_or(AuthError::CodeInvalid)?;

    let matches = stored.len() == code.len() && bool::from(stored.as_bytes().ct_eq(code.as_bytes()));
    if !matches {
        record_failed_attempt(db, email, &stored).await?;
        return Err(AuthError::CodeInvalid.into());
    }

    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AuthError::CodeInvalid)?;
    if now >= expires_at {
        sqlx::query("DELETE FROM one_time_codes WHERE email = ?")
            .bind(email)
            .execute(db)
            .await?;
        return Err(AuthError::CodeInvalid.into());
    }

    // A concurrent consumer may have won the race
    let deleted = sqlx::query("DELETE FROM one_time_codes WHERE email = ? AND code = ?")
        .bind(email)
        .bind(&stored)
        .execute(db)
        .await?;
    if deleted.rows_affected() != 1 {
        return Err(AuthError::CodeInvalid.into());
    }

    Ok(())
}

/// Count a wrong guess and drop the code once the limit is reached
async fn record_failed_attempt(db: &DbPool, email: &str, stored: &str) -> Result<()> {
    sqlx::query("UPDATE one_time_codes SET attempts = attempts + 1 WHERE email = ? AND code = ?")
        .bind(email)
        .bind(stored)
        .execute(db)
        .await?;

    let burned = sqlx::query("DELETE FROM one_time_codes WHERE email = ? AND attempts >= ?")
        .bind(email)
        .bind(MAX_ATTEMPTS)
        .execute(db)
        .await?;
    if burned.rows_affected() > 0 {
        tracing::warn!(email = %email, "One-time code discarded after repeated wrong guesses");
    }
    Ok(())
}
