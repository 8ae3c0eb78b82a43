//! Cart and wishlist endpoints for the signed-in user.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::ApiError;
use super::validation::validate_uuid;
use crate::cart::{self, wishlist};
use crate::db::{
    AddToCartRequest, CartState, SizeQuery, UpdateCartRequest, WishlistRequest, WishlistState,
};
use crate::AppState;

pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartState>, ApiError> {
    Ok(Json(cart::get(&state.db, &user.id).await?))
}

pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartState>, ApiError> {
    let cart = cart::add_item(
        &state.db,
        &user.id,
        &request.product_id,
        request.size.as_deref(),
    )
    .await?;
    Ok(Json(cart))
}

pub async fn update_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartState>, ApiError> {
    let cart = cart::set_quantity(
        &state.db,
        &user.id,
        &request.product_id,
        request.size.as_deref(),
        request.quantity,
    )
    .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/remove/:id?size=
pub async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
    Query(query): Query<SizeQuery>,
) -> Result<Json<CartState>, ApiError> {
    if let Err(e) = validate_uuid(&product_id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }
    let cart = cart::remove_item(&state.db, &user.id, &product_id, query.size.as_deref()).await?;
    Ok(Json(cart))
}

pub async fn empty_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartState>, ApiError> {
    cart::clear(&state.db, &user.id).await?;
    Ok(Json(CartState {
        items: Vec::new(),
        item_count: 0,
    }))
}

pub async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<WishlistState>, ApiError> {
    Ok(Json(wishlist::get(&state.db, &user.id).await?))
}

pub async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<WishlistRequest>,
) -> Result<Json<WishlistState>, ApiError> {
    Ok(Json(
        wishlist::add(&state.db, &user.id, &request.product_id).await?,
    ))
}

pub async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<WishlistState>, ApiError> {
    if let Err(e) = validate_uuid(&product_id, "product_id") {
        return Err(ApiError::validation_field("product_id", e));
    }
    Ok(Json(
        wishlist::remove(&state.db, &user.id, &product_id).await?,
    ))
}
