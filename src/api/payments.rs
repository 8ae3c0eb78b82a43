//! Checkout endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::{AdminUser, AuthUser, OptionalUser};
use super::error::ApiError;
use super::validation::validate_uuid;
use crate::db::{CheckoutSubmission, CreateIntentRequest, OrderResponse, OrderStatus, UpdateStatusRequest};
use crate::payments::ProviderOrderRef;
use crate::AppState;

/// POST /api/payment/order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<ProviderOrderRef>, ApiError> {
    let intent = state
        .reconciliation()
        .create_payment_intent(request.amount)
        .await?;
    Ok(Json(intent))
}

/// POST /api/payment/verify
///
/// Guests may check out; a signed-in buyer's account is linked to the order.
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Json(submission): Json<CheckoutSubmission>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .reconciliation()
        .verify_and_persist(submission, user.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn my_orders(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    Ok(Json(state.reconciliation().orders_for(&user).await?))
}

pub async fn all_orders(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    Ok(Json(state.reconciliation().all_orders().await?))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(order_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    if let Err(e) = validate_uuid(&order_id, "order_id") {
        return Err(ApiError::validation_field("order_id", e));
    }
    let status: OrderStatus = request
        .status
        .parse()
        .map_err(|e: String| ApiError::validation_field("status", e))?;

    let order = state
        .reconciliation()
        .update_status(&order_id, status)
        .await?;
    tracing::info!(order_id = %order.id, admin_id = %admin.id, status = %order.status, "Order status changed by admin");
    Ok(Json(order))
}
