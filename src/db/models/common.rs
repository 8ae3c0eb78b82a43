//! Common types and utilities shared across models.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Helper to parse a JSON column from the database, falling back to the
/// type's default on missing or malformed data
pub fn parse_json<T: DeserializeOwned + Default>(json: &str) -> T {
    serde_json::from_str(json).unwrap_or_default()
}

/// Helper to serialize a value into a JSON column
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Largest single amount accepted, in minor units (1 crore rupees)
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000;

/// Convert a major-unit amount (e.g. rupees) into integer minor units
/// (paise). Returns `None` for negative, non-finite input or anything above
/// [`MAX_AMOUNT_MINOR`].
pub fn to_minor_units(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }
    let minor = (amount * 100.0).round();
    if minor > MAX_AMOUNT_MINOR as f64 {
        return None;
    }
    Some(minor as i64)
}

/// Convert integer minor units back into a major-unit amount
pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// A list field clients may send either as an array or as a single
/// comma-separated string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StringList {
    Many(Vec<String>),
    One(String),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            StringList::Many(items) => items,
            StringList::One(joined) => joined.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// RFC 3339 timestamp for `created_at` / `updated_at` columns
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Time-ordered identifier; lexical order of ids follows creation order
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(499.0), Some(49_900));
        assert_eq!(to_minor_units(0.1 + 0.2), Some(30));
        assert_eq!(to_minor_units(19.999), Some(2_000));
        assert_eq!(to_minor_units(-1.0), None);
        assert_eq!(to_minor_units(f64::NAN), None);
        assert_eq!(to_minor_units(10_000_000.0), Some(MAX_AMOUNT_MINOR));
        assert_eq!(to_minor_units(10_000_000.01), None);
        assert_eq!(to_minor_units(4.0e16), None);
        assert_eq!(from_minor_units(49_900), 499.0);
    }

    #[test]
    fn test_string_list() {
        let many = StringList::Many(vec![" S ".into(), "".into(), "M".into()]);
        assert_eq!(many.into_vec(), vec!["S", "M"]);

        let one = StringList::One("https://a/1.jpg, https://a/2.jpg".into());
        assert_eq!(one.into_vec(), vec!["https://a/1.jpg", "https://a/2.jpg"]);

        let parsed: StringList = serde_json::from_str(r#""XL""#).unwrap();
        assert_eq!(parsed.into_vec(), vec!["XL"]);
    }

    #[test]
    fn test_parse_json_fallback() {
        let parsed: Vec<String> = parse_json("not json");
        assert!(parsed.is_empty());
        let parsed: Vec<String> = parse_json(r#"["a","b"]"#);
        assert_eq!(parsed, vec!["a", "b"]);
    }

    #[test]
    fn test_ids_are_time_ordered() {
        let first = new_id();
        let second = new_id();
        assert!(first < second);
    }
}
