//! Catalog endpoints. Reads are public, writes need an admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::AdminUser;
use super::error::ApiError;
use super::validation::validate_uuid;
use crate::catalog;
use crate::db::{
    BulkInsertResponse, BulkProducts, NewProduct, ProductPage, ProductPatch, ProductQuery,
    ProductResponse,
};
use crate::AppState;

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>, ApiError> {
    Ok(Json(catalog::list(&state.db, &query).await?))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }
    Ok(Json(catalog::get(&state.db, &id).await?))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = catalog::create(&state.db, product).await?;
    tracing::info!(product_id = %product.id, admin_id = %admin.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn bulk_create_products(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<BulkProducts>,
) -> Result<(StatusCode, Json<BulkInsertResponse>), ApiError> {
    let products = body.into_vec();
    if products.is_empty() {
        return Err(ApiError::validation_field("products", "No products supplied"));
    }
    let inserted_count = catalog::bulk_create(&state.db, products).await?;
    tracing::info!(inserted_count, admin_id = %admin.id, "Bulk product import");
    Ok((StatusCode::CREATED, Json(BulkInsertResponse { inserted_count })))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<ProductResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }
    Ok(Json(catalog::update(&state.db, &id, patch).await?))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if let Err(e) = validate_uuid(&id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }
    catalog::delete(&state.db, &id).await?;
    tracing::info!(product_id = %id, admin_id = %admin.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
