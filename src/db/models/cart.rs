//! Cart and wishlist models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::product::ProductResponse;

/// A stored cart line. `size` is empty when the product has no variant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub user_id: String,
    pub product_id: String,
    pub size: String,
    pub quantity: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Cart line joined with live product data. `product` is `None` only while
/// a concurrent delete is in flight.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: String,
    pub size: Option<String>,
    pub quantity: i64,
    pub product: Option<ProductResponse>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct WishlistState {
    pub items: Vec<ProductResponse>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    #[serde(alias = "productId")]
    pub product_id: String,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    #[serde(alias = "productId")]
    pub product_id: String,
    pub size: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    #[serde(alias = "productId")]
    pub product_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SizeQuery {
    pub size: Option<String>,
}

/// Storage form of an optional variant
pub fn size_key(size: Option<&str>) -> String {
    size.map(str::trim).unwrap_or_default().to_string()
}
