//! Address book and customer listing endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::{AdminUser, AuthUser};
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_uuid;
use crate::customers;
use crate::db::{Address, AddressRequest, UserResponse};
use crate::AppState;

/// Report every bad field at once rather than the first one
fn check_address(request: &AddressRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    for (field, result) in customers::address_checks(request) {
        errors.check(field, result);
    }
    errors.finish()
}

pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Address>>, ApiError> {
    Ok(Json(customers::list_addresses(&state.db, &user.id).await?))
}

pub async fn add_address(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Vec<Address>>), ApiError> {
    check_address(&request)?;
    let addresses = customers::add_address(&state.db, &user.id, request).await?;
    Ok((StatusCode::CREATED, Json(addresses)))
}

pub async fn delete_address(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(address_id): Path<String>,
) -> Result<Json<Vec<Address>>, ApiError> {
    if let Err(e) = validate_uuid(&address_id, "address_id") {
        return Err(ApiError::validation_field("address_id", e));
    }
    Ok(Json(
        customers::delete_address(&state.db, &user.id, &address_id).await?,
    ))
}

pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(customers::list_customers(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;
    use crate::db::AddressKind;

    #[test]
    fn test_check_address_collects_all_fields() {
        let request = AddressRequest {
            name: "".into(),
            phone: "12".into(),
            pincode: "abc".into(),
            locality: "Vijay Nagar".into(),
            address: "12 MG Road".into(),
            city: "Indore".into(),
            state: "MP".into(),
            landmark: None,
            kind: AddressKind::Home,
        };
        let err = check_address(&request).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let details = err.details().unwrap();
        let mut fields: Vec<&str> = details.keys().map(String::as_str).collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["name", "phone", "pincode"]);
    }
}
