use crate::db::{now_timestamp, DbPool, Product, ProductResponse, WishlistState};
use crate::error::Result;

use super::ensure_product;

/// Products on the wishlist, most recently added first
pub async fn get(db: &DbPool, user_id: &str) -> Result<WishlistState> {
    let products: Vec<Product> = sqlx::query_as(
        r#"
        SELECT p.* FROM wishlist_items w
        JOIN products p ON p.id = w.product_id
        WHERE w.user_id = ?
        ORDER BY w.created_at DESC, w.rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(WishlistState {
        items: products.into_iter().map(ProductResponse::from).collect(),
    })
}

pub async fn add(db: &DbPool, user_id: &str, product_id: &str) -> Result<WishlistState> {
    ensure_product(db, product_id).await?;

    sqlx::query(
        "INSERT INTO wishlist_items (user_id, product_id, created_at) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(now_timestamp())
    .execute(db)
    .await?;

    get(db, user_id).await
}

pub async fn remove(db: &DbPool, user_id: &str, product_id: &str) -> Result<WishlistState> {
    sqlx::query("DELETE FROM wishlist_items WHERE user_id = ? AND product_id = ?")
        .bind(user_id)
        .bind(product_id)
        .execute(db)
        .await?;

    get(db, user_id).await
}
