//! Per-user cart and wishlist.
//!
//! A cart line is keyed by `(user, product, size)`; adding the same key
//! again bumps the quantity in a single upsert, so concurrent adds never
//! lose an increment. A cart exists exactly when it has lines.

pub mod wishlist;

use std::collections::HashMap;

use crate::catalog;
use crate::db::{
    now_timestamp, size_key, CartItem, CartLine, CartState, DbPool, Product, ProductResponse,
};
use crate::error::{Error, Result};

async fn ensure_product(db: &DbPool, product_id: &str) -> Result<()> {
    if catalog::find(db, product_id).await?.is_none() {
        return Err(Error::not_found("Product"));
    }
    Ok(())
}

pub async fn get(db: &DbPool, user_id: &str) -> Result<CartState> {
    let items: Vec<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE user_id = ? ORDER BY created_at, rowid")
            .bind(user_id)
            .fetch_all(db)
            .await?;

    let products: Vec<Product> = sqlx::query_as(
        "SELECT * FROM products WHERE id IN (SELECT product_id FROM cart_items WHERE user_id = ?)",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    let products: HashMap<String, ProductResponse> = products
        .into_iter()
        .map(|p| (p.id.clone(), ProductResponse::from(p)))
        .collect();

    let item_count = items.iter().map(|i| i.quantity).sum();
    let items = items
        .into_iter()
        .map(|item| CartLine {
            product: products.get(&item.product_id).cloned(),
            size: Some(item.size).filter(|s| !s.is_empty()),
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    Ok(CartState { items, item_count })
}

/// Add one unit of `(product, size)`, creating the line if needed
pub async fn add_item(
    db: &DbPool,
    user_id: &str,
    product_id: &str,
    size: Option<&str>,
) -> Result<CartState> {
    ensure_product(db, product_id).await?;
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO cart_items (user_id, product_id, size, quantity, created_at, updated_at)
        VALUES (?, ?, ?, 1, ?, ?)
        ON CONFLICT(user_id, product_id, size) DO UPDATE SET
            quantity = quantity + 1,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(size_key(size))
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    get(db, user_id).await
}

pub async fn set_quantity(
    db: &DbPool,
    user_id: &str,
    product_id: &str,
    size: Option<&str>,
    quantity: i64,
) -> Result<CartState> {
    if quantity < 1 {
        return Err(Error::validation("quantity", "Quantity must be at least 1"));
    }

    let result = sqlx::query(
        "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE user_id = ? AND product_id = ? AND size = ?",
    )
    .bind(quantity)
    .bind(now_timestamp())
    .bind(user_id)
    .bind(product_id)
    .bind(size_key(size))
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Cart item"));
    }

    get(db, user_id).await
}

/// Remove a line. Removing a line that is not there is not an error.
pub async fn remove_item(
    db: &DbPool,
    user_id: &str,
    product_id: &str,
    size: Option<&str>,
) -> Result<CartState> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ? AND size = ?")
        .bind(user_id)
        .bind(product_id)
        .bind(size_key(size))
        .execute(db)
        .await?;

    get(db, user_id).await
}

pub async fn clear(db: &DbPool, user_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    tracing::debug!(user_id = %user_id, removed = result.rows_affected(), "Cart cleared");
    Ok(())
}
