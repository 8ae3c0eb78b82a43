//! Authentication endpoints and request extractors.
//!
//! A session token is accepted from the `Authorization: Bearer` header or
//! from the `token` cookie set on login. The role is always read from the
//! database so a demotion takes effect on the next request.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use crate::auth::{self, SessionToken};
use crate::config::{AuthConfig, CookieSameSite};
use crate::db::{
    ExternalProfile, LoginRequest, LoginResponse, RegisterRequest, Role, UpdateProfileRequest,
    User, UserResponse,
};
use crate::error::AuthError;
use crate::{customers, AppState};

pub const SESSION_COOKIE: &str = "token";
pub const FEDERATION_SECRET_HEADER: &str = "x-federation-secret";

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Session token from the header, falling back to the cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Resolve a session token to its (current) user
pub async fn user_from_token(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = state.sessions.verify(token)?;
    auth::find_user_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::from(AuthError::TokenInvalid))
}

/// Any signed-in user
pub struct AuthUser(pub User);

/// Signed-in user if a valid token was presented, guest otherwise
pub struct OptionalUser(pub Option<User>);

/// Signed-in user with the admin role
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        Ok(AuthUser(user_from_token(state, &token).await?))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(OptionalUser(None));
        };
        // A stale cookie must not block a guest checkout
        match user_from_token(state, &token).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(e) if e.status() == StatusCode::UNAUTHORIZED => Ok(OptionalUser(None)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role() != Role::Admin {
            return Err(AuthError::Forbidden.into());
        }
        Ok(AdminUser(user))
    }
}

fn session_cookie(config: &AuthConfig, ttl: Duration, token: String) -> Cookie<'static> {
    let same_site = match config.cookie_same_site {
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::Lax => SameSite::Lax,
    };
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(same_site)
        .path("/")
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Body + cookie for every endpoint that signs a user in
fn signed_in(
    state: &AppState,
    jar: CookieJar,
    user: User,
    session: SessionToken,
) -> (CookieJar, Json<LoginResponse>) {
    let cookie = session_cookie(&state.config.auth, state.sessions.ttl(), session.token.clone());
    let jar = jar.add(cookie);
    (
        jar,
        Json(LoginResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
            user: UserResponse::from(user),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(alias = "otp")]
    pub code: String,
    #[serde(alias = "newPassword")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeLoginRequest {
    pub email: String,
    #[serde(alias = "otp")]
    pub code: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), ApiError> {
    let (user, session) =
        auth::register(&state.db, &state.sessions, &state.notifier, request).await?;
    let (jar, body) = signed_in(&state, jar, user, session);
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (user, session) =
        auth::authenticate(&state.db, &state.sessions, &request.email, &request.password).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(signed_in(&state, jar, user, session))
}

/// Sign in with a profile the identity broker already verified. The broker
/// proves itself with the shared federation secret.
pub async fn federated(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(profile): Json<ExternalProfile>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let expected = state
        .config
        .auth
        .federation_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::forbidden("Federated sign-in is not enabled"))?;
    let presented = headers
        .get(FEDERATION_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let matches = expected.len() == presented.len()
        && bool::from(expected.as_bytes().ct_eq(presented.as_bytes()));
    if !matches {
        return Err(ApiError::unauthorized("Invalid federation secret"));
    }

    let (user, session) =
        auth::issue_federated_session(&state.db, &state.sessions, profile).await?;
    Ok(signed_in(&state, jar, user, session))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    auth::request_code(
        &state.db,
        &state.notifier,
        &request.email,
        Duration::minutes(state.config.auth.code_ttl_minutes),
        Utc::now(),
    )
    .await?;
    Ok(MessageResponse::ok("Verification code sent"))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (user, session) = auth::reset_password(
        &state.db,
        &state.sessions,
        &request.email,
        &request.code,
        &request.password,
        Utc::now(),
    )
    .await?;
    Ok(signed_in(&state, jar, user, session))
}

pub async fn login_with_code(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<CodeLoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let (user, session) = auth::passwordless_login(
        &state.db,
        &state.sessions,
        &request.email,
        &request.code,
        Utc::now(),
    )
    .await?;
    Ok(signed_in(&state, jar, user, session))
}

/// Tokens are stateless; logging out only drops the cookie
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, MessageResponse::ok("Logged out"))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = customers::update_profile(&state.db, &user.id, request).await?;
    Ok(Json(UserResponse::from(user)))
}
