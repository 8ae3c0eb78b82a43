//! Input validation for API requests.
//!
//! Each validator returns `Err(message)` on failure. Services turn these
//! into field-level [`Error::Validation`](crate::error::Error) values, and
//! handlers can collect several of them with `ValidationErrorBuilder`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic e-mail shape check: local@domain.tld, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();

    /// Phone numbers: digits with optional leading + and separators
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 -]{6,18}[0-9]$"
    ).unwrap();

    /// Indian postal code
    static ref PINCODE_REGEX: Regex = Regex::new(
        r"^[1-9][0-9]{5}$"
    ).unwrap();
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalized form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > 1024 {
        return Err("Password is too long".to_string());
    }
    Ok(())
}

/// Validate a required, human-entered text field
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field_name));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!(
            "{} is too long (max {} characters)",
            field_name, max_len
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if !PHONE_REGEX.is_match(phone.trim()) {
        return Err("Invalid phone number".to_string());
    }
    Ok(())
}

pub fn validate_pincode(pincode: &str) -> Result<(), String> {
    if !PINCODE_REGEX.is_match(pincode.trim()) {
        return Err("Pincode must be 6 digits".to_string());
    }
    Ok(())
}

/// Validate a monetary amount in major units
pub fn validate_amount(amount: f64, field_name: &str) -> Result<(), String> {
    if !amount.is_finite() {
        return Err(format!("{} must be a number", field_name));
    }
    if amount < 0.0 {
        return Err(format!("{} must not be negative", field_name));
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock must not be negative".to_string());
    }
    Ok(())
}

/// Validate a UUID string
pub fn validate_uuid(id: &str, field_name: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} is required", field_name));
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("Invalid {} format", field_name));
    }

    Ok(())
}
