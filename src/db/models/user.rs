//! User, address and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::parse_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub phone: String,
    pub avatar_url: Option<String>,
    /// JSON array of Address objects
    pub addresses: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }

    pub fn get_addresses(&self) -> Vec<Address> {
        parse_json(&self.addresses)
    }
}

/// User as returned to clients (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub avatar_url: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            role: user.role(),
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            avatar_url: user.avatar_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AddressKind {
    #[default]
    Home,
    Work,
    Other,
}

/// Address embedded in the user record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub pincode: String,
    pub locality: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub landmark: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AddressKind,
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub name: String,
    pub phone: String,
    pub pincode: String,
    pub locality: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub landmark: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AddressKind,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A verified identity handed over by the external identity broker
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalProfile {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_response_hides_hash() {
        let user = User {
            id: "u1".into(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: "admin".into(),
            phone: String::new(),
            avatar_url: None,
            addresses: "[]".into(),
            created_at: String::new(),
            updated_at: String::new(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));

        let response = UserResponse::from(user);
        assert_eq!(response.role, Role::Admin);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_address_kind_defaults_to_home() {
        let req: AddressRequest = serde_json::from_str(
            r#"{"name":"Ann","phone":"1","pincode":"452001","locality":"Vijay Nagar",
                "address":"12 MG Road","city":"Indore","state":"MP"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, AddressKind::Home);
        assert!(req.landmark.is_none());
    }
}
