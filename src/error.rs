//! Domain error taxonomy shared by every service module.
//!
//! Services return [`Result`]; the HTTP layer maps each variant onto an
//! [`ApiError`](crate::api::error::ApiError) with a conventional status code.

use thiserror::Error;

/// Authentication and authorization failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown e-mail or wrong password. Both cases look the same to callers.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid session token")]
    TokenInvalid,

    #[error("Session expired")]
    TokenExpired,

    /// Missing, mismatched, expired or already-used one-time code.
    #[error("Invalid or expired code")]
    CodeInvalid,

    #[error("Insufficient permissions")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0} not found")]
    NotFound(String),

    /// Payment signature did not match; nothing was recorded.
    #[error("Payment verification failed")]
    InvalidSignature,

    /// An external collaborator (payment gateway, mail relay) failed.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
