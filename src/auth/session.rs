//! Signed session tokens.
//!
//! Sessions are stateless HS256 JWTs. The same lifetime applies to the token
//! and to the cookie that carries it.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::db::{Role, User};
use crate::error::{AuthError, Error, Result};

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::hours(config.session_ttl_hours))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<SessionToken> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<SessionToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.clone(),
            role: user.role(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign session token: {}", e)))?;

        Ok(SessionToken { token, expires_at })
    }

    /// Check signature and expiry; no clock leeway is granted.
    pub fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        User {
            id: "0190f1f4-0000-7000-8000-000000000001".into(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: String::new(),
            role: role.into(),
            phone: String::new(),
            avatar_url: None,
            addresses: "[]".into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = SessionIssuer::new("secret", Duration::hours(168));
        let session = issuer.issue(&user("admin")).unwrap();

        let claims = issuer.verify(&session.token).unwrap();
        assert_eq!(claims.sub, "0190f1f4-0000-7000-8000-000000000001");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let issuer = SessionIssuer::new("secret", Duration::hours(1));
        let session = issuer
            .issue_at(&user("user"), Utc::now() - Duration::hours(2))
            .unwrap();
        assert_eq!(issuer.verify(&session.token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let ours = SessionIssuer::new("secret", Duration::hours(1));
        let theirs = SessionIssuer::new("other", Duration::hours(1));
        let session = theirs.issue(&user("admin")).unwrap();

        assert_eq!(ours.verify(&session.token), Err(AuthError::TokenInvalid));
        assert_eq!(ours.verify("not.a.jwt"), Err(AuthError::TokenInvalid));
    }
}
