//! Customer profile and address book.
//!
//! Addresses are embedded in the user row as a JSON array and edited with
//! SQLite's JSON functions, so each change is a single statement.

use crate::api::validation::{validate_phone, validate_pincode, validate_required};
use crate::auth::find_user_by_id;
use crate::db::{
    new_id, now_timestamp, to_json, Address, AddressRequest, DbPool, Role, UpdateProfileRequest,
    User, UserResponse,
};
use crate::error::{Error, Result};

async fn load_user(db: &DbPool, user_id: &str) -> Result<User> {
    find_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User"))
}

pub async fn update_profile(
    db: &DbPool,
    user_id: &str,
    request: UpdateProfileRequest,
) -> Result<User> {
    let user = load_user(db, user_id).await?;

    let name = match request.name {
        Some(name) => {
            validate_required(&name, "Name", 100).map_err(|m| Error::validation("name", m))?;
            name.trim().to_string()
        }
        None => user.name,
    };
    let phone = match request.phone.map(|p| p.trim().to_string()) {
        Some(phone) if !phone.is_empty() => {
            validate_phone(&phone).map_err(|m| Error::validation("phone", m))?;
            phone
        }
        Some(_) => String::new(),
        None => user.phone,
    };

    sqlx::query("UPDATE users SET name = ?, phone = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&phone)
        .bind(now_timestamp())
        .bind(user_id)
        .execute(db)
        .await?;

    tracing::info!(user_id = %user_id, "Profile updated");
    load_user(db, user_id).await
}

/// Outcome of every address field rule, keyed by field name
pub fn address_checks(
    request: &AddressRequest,
) -> [(&'static str, std::result::Result<(), String>); 7] {
    [
        ("name", validate_required(&request.name, "Name", 100)),
        ("phone", validate_phone(&request.phone)),
        ("pincode", validate_pincode(&request.pincode)),
        ("locality", validate_required(&request.locality, "Locality", 200)),
        ("address", validate_required(&request.address, "Address", 500)),
        ("city", validate_required(&request.city, "City", 100)),
        ("state", validate_required(&request.state, "State", 100)),
    ]
}

/// Reject the address on its first bad field
pub fn validate_address(request: &AddressRequest) -> Result<()> {
    for (field, result) in address_checks(request) {
        result.map_err(|m| Error::validation(field, m))?;
    }
    Ok(())
}

pub async fn list_addresses(db: &DbPool, user_id: &str) -> Result<Vec<Address>> {
    Ok(load_user(db, user_id).await?.get_addresses())
}

pub async fn add_address(
    db: &DbPool,
    user_id: &str,
    request: AddressRequest,
) -> Result<Vec<Address>> {
    validate_address(&request)?;

    let address = Address {
        id: new_id(),
        name: request.name.trim().to_string(),
        phone: request.phone.trim().to_string(),
        pincode: request.pincode.trim().to_string(),
        locality: request.locality.trim().to_string(),
        address: request.address.trim().to_string(),
        city: request.city.trim().to_string(),
        state: request.state.trim().to_string(),
        landmark: request
            .landmark
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        kind: request.kind,
    };

    let result = sqlx::query(
        "UPDATE users SET addresses = json_insert(addresses, '$[#]', json(?)), updated_at = ? WHERE id = ?",
    )
    .bind(to_json(&address))
    .bind(now_timestamp())
    .bind(user_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("User"));
    }

    tracing::info!(user_id = %user_id, address_id = %address.id, "Address added");
    list_addresses(db, user_id).await
}

/// Delete an address by id. Deleting an unknown id leaves the book as is.
pub async fn delete_address(db: &DbPool, user_id: &str, address_id: &str) -> Result<Vec<Address>> {
    sqlx::query(
        r#"
        UPDATE users SET
            addresses = (
                SELECT json_group_array(json(value)) FROM json_each(users.addresses)
                WHERE json_extract(value, '$.id') IS NOT ?
            ),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(address_id)
    .bind(now_timestamp())
    .bind(user_id)
    .execute(db)
    .await?;

    list_addresses(db, user_id).await
}

/// All shopper accounts, newest first
pub async fn list_customers(db: &DbPool) -> Result<Vec<UserResponse>> {
    let users: Vec<User> =
        sqlx::query_as("SELECT * FROM users WHERE role = ? ORDER BY created_at DESC, id DESC")
            .bind(Role::User.to_string())
            .fetch_all(db)
            .await?;
    Ok(users.into_iter().map(UserResponse::from).collect())
}
