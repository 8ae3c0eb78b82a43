//! Credential store and session issuing.
//!
//! Accounts sign in with a password, through the external identity broker,
//! or with a one-time code sent by e-mail. Every successful path ends in a
//! [`SessionToken`].

pub mod one_time_code;
pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::{Claims, SessionIssuer, SessionToken};

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::api::validation::{
    normalize_email, validate_email, validate_password, validate_phone, validate_required,
};
use crate::db::{new_id, now_timestamp, DbPool, ExternalProfile, RegisterRequest, Role, User};
use crate::error::{AuthError, Error, Result};
use crate::notifications::{spawn_best_effort, Notifier};

pub async fn find_user_by_email(db: &DbPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(normalize_email(email))
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_user_by_id(db: &DbPool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

async fn insert_user(
    db: &DbPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    phone: &str,
    avatar_url: Option<&str>,
) -> Result<User> {
    let id = new_id();
    let now = now_timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, phone, avatar_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.to_string())
    .bind(phone)
    .bind(avatar_url)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.message().contains("UNIQUE constraint failed") => {
            return Err(Error::Conflict("User already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    find_user_by_id(db, &id)
        .await?
        .ok_or_else(|| Error::Internal("User vanished after insert".to_string()))
}

/// Password login. Unknown e-mail and wrong password are indistinguishable.
pub async fn authenticate(
    db: &DbPool,
    issuer: &SessionIssuer,
    email: &str,
    password: &str,
) -> Result<(User, SessionToken)> {
    let user = find_user_by_email(db, email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    let session = issuer.issue(&user)?;
    Ok((user, session))
}

pub async fn register(
    db: &DbPool,
    issuer: &SessionIssuer,
    notifier: &Arc<dyn Notifier>,
    request: RegisterRequest,
) -> Result<(User, SessionToken)> {
    let email = normalize_email(&request.email);
    validate_required(&request.name, "Name", 100).map_err(|m| Error::validation("name", m))?;
    validate_email(&email).map_err(|m| Error::validation("email", m))?;
    validate_password(&request.password).map_err(|m| Error::validation("password", m))?;
    let phone = request.phone.as_deref().map(str::trim).unwrap_or_default();
    if !phone.is_empty() {
        validate_phone(phone).map_err(|m| Error::validation("phone", m))?;
    }

    if find_user_by_email(db, &email).await?.is_some() {
        return Err(Error::Conflict("User already exists".to_string()));
    }

    let hash = hash_password(&request.password)?;
    let user = insert_user(db, request.name.trim(), &email, &hash, Role::User, phone, None).await?;
    tracing::info!(user_id = %user.id, "User registered");

    let notifier = notifier.clone();
    let (to, name) = (user.email.clone(), user.name.clone());
    spawn_best_effort("welcome", async move { notifier.welcome(&to, &name).await });

    let session = issuer.issue(&user)?;
    Ok((user, session))
}

/// Find-or-create an account for an identity the broker already verified.
pub async fn issue_federated_session(
    db: &DbPool,
    issuer: &SessionIssuer,
    profile: ExternalProfile,
) -> Result<(User, SessionToken)> {
    let email = normalize_email(&profile.email);
    validate_email(&email).map_err(|m| Error::validation("email", m))?;

    let user = match find_user_by_email(db, &email).await? {
        Some(user) => {
            if profile.avatar_url.is_some() && user.avatar_url != profile.avatar_url {
                sqlx::query("UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ?")
                    .bind(&profile.avatar_url)
                    .bind(now_timestamp())
                    .bind(&user.id)
                    .execute(db)
                    .await?;
            }
            let refreshed = find_user_by_id(db, &user.id).await?;
            refreshed.unwrap_or(user)
        }
        None => {
            let name = if profile.name.trim().is_empty() {
                email.split('@').next().unwrap_or_default().to_string()
            } else {
                profile.name.trim().to_string()
            };
            let placeholder = password::unusable_password_hash()?;
            let user = insert_user(
                db,
                &name,
                &email,
                &placeholder,
                Role::User,
                "",
                profile.avatar_url.as_deref(),
            )
            .await?;
            tracing::info!(user_id = %user.id, "Federated user created");
            user
        }
    };

    let session = issuer.issue(&user)?;
    Ok((user, session))
}

/// Generate, store and e-mail a one-time code. Delivery failure is an error
/// because an undelivered code is useless.
pub async fn request_code(
    db: &DbPool,
    notifier: &Arc<dyn Notifier>,
    email: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<()> {
    let user = find_user_by_email(db, email)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;

    let code = one_time_code::issue(db, &user.email, ttl, now).await?;

    notifier
        .one_time_code(&user.email, &user.name, &code, ttl.num_minutes())
        .await
        .map_err(|e| Error::Provider(format!("Failed to deliver code: {}", e)))?;

    tracing::info!(user_id = %user.id, "One-time code issued");
    Ok(())
}

pub async fn reset_password(
    db: &DbPool,
    issuer: &SessionIssuer,
    email: &str,
    code: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<(User, SessionToken)> {
    validate_password(new_password).map_err(|m| Error::validation("password", m))?;
    let email = normalize_email(email);

    one_time_code::consume(db, &email, code, now).await?;

    let hash = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE email = ?")
        .bind(&hash)
        .bind(now_timestamp())
        .bind(&email)
        .execute(db)
        .await?;

    let user = find_user_by_email(db, &email)
        .await?
        .ok_or(AuthError::CodeInvalid)?;
    tracing::info!(user_id = %user.id, "Password reset");

    let session = issuer.issue(&user)?;
    Ok((user, session))
}

pub async fn passwordless_login(
    db: &DbPool,
    issuer: &SessionIssuer,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(User, SessionToken)> {
    let email = normalize_email(email);
    one_time_code::consume(db, &email, code, now).await?;

    let user = find_user_by_email(db, &email)
        .await?
        .ok_or(AuthError::CodeInvalid)?;

    let session = issuer.issue(&user)?;
    Ok((user, session))
}

/// Create the bootstrap admin, or promote an existing account with that
/// e-mail. Leaves an existing password untouched.
pub async fn ensure_admin(db: &DbPool, email: &str, password: &str) -> Result<User> {
    let email = normalize_email(email);
    if let Some(user) = find_user_by_email(db, &email).await? {
        if user.role() != Role::Admin {
            sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
                .bind(Role::Admin.to_string())
                .bind(now_timestamp())
                .bind(&user.id)
                .execute(db)
                .await?;
            tracing::info!(user_id = %user.id, "Promoted existing user to admin");
        }
        return find_user_by_id(db, &user.id)
            .await?
            .ok_or_else(|| Error::not_found("User"));
    }

    validate_password(password).map_err(|m| Error::validation("admin_password", m))?;
    let hash = hash_password(password)?;
    let user = insert_user(db, "Admin", &email, &hash, Role::Admin, "", None).await?;
    tracing::info!(user_id = %user.id, "Admin account created");
    Ok(user)
}
