pub mod auth;
mod cart;
mod customers;
pub mod error;
pub mod metrics;
mod payments;
mod products;
pub mod rate_limit;
pub mod validation;
mod ws;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/federated", post(auth::federated))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/login-code", post(auth::login_with_code))
        .route("/logout", get(auth::logout))
        .route("/me", get(auth::me))
        .route("/update-profile", put(auth::update_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    let payment_routes = Router::new()
        .route("/order", post(payments::create_order))
        .route("/verify", post(payments::verify_payment))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_checkout,
        ))
        .route("/my-orders", get(payments::my_orders))
        .route("/all-orders", get(payments::all_orders))
        .route("/update-status/:id", put(payments::update_status));

    let api_routes = Router::new()
        // Catalog
        .route("/products", get(products::list_products))
        .route("/products/add", post(products::create_product))
        .route("/products/bulk-add", post(products::bulk_create_products))
        .route("/products/update/:id", patch(products::update_product))
        .route("/products/delete/:id", delete(products::delete_product))
        .route("/products/:id", get(products::get_product))
        // Cart
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/update", post(cart::update_cart))
        .route("/cart/remove/:id", delete(cart::remove_from_cart))
        .route("/cart/empty", delete(cart::empty_cart))
        // Wishlist
        .route("/wishlist", get(cart::get_wishlist))
        .route("/wishlist/add", post(cart::add_to_wishlist))
        .route("/wishlist/remove/:id", delete(cart::remove_from_wishlist))
        // Customers
        .route("/customers/addresses", get(customers::list_addresses))
        .route("/customers/addresses", post(customers::add_address))
        .route("/customers/addresses/:id", delete(customers::delete_address))
        .route("/customers/all-customers", get(customers::list_customers))
        // Admin
        .route("/admin/ledger", get(ws::ledger_snapshot))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .route("/ws/ledger", get(ws::ledger_ws))
        .nest("/api/auth", auth_routes)
        .nest("/api/payment", payment_routes)
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
