//! Catalog store: product listing, lookup and admin maintenance.
//!
//! Listing uses keyset pagination over time-ordered ids, newest first.
//! Taxonomy fields (`section`, `category`, `sub_category`) are stored
//! trimmed and lowercased so filters compare exactly.

use crate::api::validation::{validate_amount, validate_required, validate_stock};
use crate::db::{
    new_id, now_timestamp, to_json, DbPool, NewProduct, Product, ProductPage, ProductPatch,
    ProductQuery, ProductResponse, StringList, DEFAULT_SIZE, PLACEHOLDER_IMAGE,
};
use crate::error::{Error, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A product that passed validation and normalization, ready to insert
#[derive(Debug, Clone)]
struct ValidProduct {
    name: String,
    brand: String,
    description: String,
    highlights: Vec<String>,
    price: f64,
    original_price: Option<f64>,
    section: String,
    category: String,
    sub_category: String,
    images: Vec<String>,
    sizes: Vec<String>,
    colors: Vec<String>,
    stock: i64,
    is_featured: bool,
}

/// How lenient normalization is about missing media and variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Single,
    Bulk { index: usize },
}

impl Mode {
    fn field(&self, name: &str) -> String {
        match self {
            Mode::Single => name.to_string(),
            Mode::Bulk { index } => format!("products[{}].{}", index, name),
        }
    }
}

fn taxonomy(value: &str) -> String {
    value.trim().to_lowercase()
}

fn validate(product: NewProduct, mode: Mode) -> Result<ValidProduct> {
    let check = |field: &str, result: std::result::Result<(), String>| {
        result.map_err(|m| Error::validation(mode.field(field), m))
    };

    check("name", validate_required(&product.name, "Name", 200))?;
    check("brand", validate_required(&product.brand, "Brand", 100))?;
    check("description", validate_required(&product.description, "Description", 5000))?;

    let price = product
        .price
        .ok_or_else(|| Error::validation(mode.field("price"), "Price is required"))?;
    check("price", validate_amount(price, "Price"))?;
    if let Some(original) = product.original_price {
        check("original_price", validate_amount(original, "Original price"))?;
    }
    check("stock", validate_stock(product.stock))?;

    let mut images = product
        .images
        .map(|list| list.into_vec())
        .filter(|list| !list.is_empty())
        .or_else(|| product.external_image_urls.map(|list| list.into_vec()))
        .unwrap_or_default();
    if images.is_empty() {
        match mode {
            Mode::Single => {
                return Err(Error::validation(
                    mode.field("images"),
                    "At least one image is required",
                ))
            }
            Mode::Bulk { .. } => images.push(PLACEHOLDER_IMAGE.to_string()),
        }
    }

    let mut sizes = product.sizes.map(|list| list.into_vec()).unwrap_or_default();
    if sizes.is_empty() && matches!(mode, Mode::Bulk { .. }) {
        sizes.push(DEFAULT_SIZE.to_string());
    }

    Ok(ValidProduct {
        name: product.name.trim().to_string(),
        brand: product.brand.trim().to_string(),
        description: product.description.trim().to_string(),
        highlights: product.highlights.map(|l| l.into_vec()).unwrap_or_default(),
        price,
        original_price: product.original_price,
        section: taxonomy(&product.section),
        category: taxonomy(&product.category),
        sub_category: taxonomy(&product.sub_category),
        images,
        sizes,
        colors: product.colors.map(|l| l.into_vec()).unwrap_or_default(),
        stock: product.stock,
        is_featured: product.is_featured,
    })
}

async fn insert<'e, E>(executor: E, product: &ValidProduct) -> Result<String>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let id = new_id();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, brand, description, highlights, price, original_price,
            section, category, sub_category, images, sizes, colors, stock, is_featured,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&product.name)
    .bind(&product.brand)
    .bind(&product.description)
    .bind(to_json(&product.highlights))
    .bind(product.price)
    .bind(product.original_price)
    .bind(&product.section)
    .bind(&product.category)
    .bind(&product.sub_category)
    .bind(to_json(&product.images))
    .bind(to_json(&product.sizes))
    .bind(to_json(&product.colors))
    .bind(product.stock)
    .bind(product.is_featured)
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await?;

    Ok(id)
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub async fn list(db: &DbPool, query: &ProductQuery) -> Result<ProductPage> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(cursor) = query.cursor.as_deref().filter(|c| !c.is_empty()) {
        conditions.push("id < ?".to_string());
        bindings.push(cursor.to_string());
    }

    for (column, value) in [
        ("section", &query.section),
        ("category", &query.category),
        ("sub_category", &query.sub_category),
    ] {
        if let Some(value) = value.as_deref().map(taxonomy).filter(|v| !v.is_empty()) {
            conditions.push(format!("{} = ?", column));
            bindings.push(value);
        }
    }

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conditions.push(
            r"(name LIKE ? ESCAPE '\' OR brand LIKE ? ESCAPE '\' OR category LIKE ? ESCAPE '\')"
                .to_string(),
        );
        let pattern = like_pattern(term);
        bindings.extend(std::iter::repeat(pattern).take(3));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT * FROM products {} ORDER BY id DESC LIMIT ?",
        where_clause
    );
    let mut query_builder = sqlx::query_as::<_, Product>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    query_builder = query_builder.bind(i64::from(limit) + 1);

    let mut rows = query_builder.fetch_all(db).await?;

    let has_more = rows.len() > limit as usize;
    rows.truncate(limit as usize);
    let next_cursor = if has_more {
        rows.last().map(|p| p.id.clone())
    } else {
        None
    };

    Ok(ProductPage {
        items: rows.into_iter().map(ProductResponse::from).collect(),
        next_cursor,
        has_more,
    })
}

pub async fn find(db: &DbPool, id: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(product)
}

pub async fn get(db: &DbPool, id: &str) -> Result<ProductResponse> {
    find(db, id)
        .await?
        .map(ProductResponse::from)
        .ok_or_else(|| Error::not_found("Product"))
}

pub async fn create(db: &DbPool, product: NewProduct) -> Result<ProductResponse> {
    let valid = validate(product, Mode::Single)?;
    let id = insert(db, &valid).await?;
    tracing::info!(product_id = %id, name = %valid.name, "Product created");
    get(db, &id).await
}

/// Import many products atomically. Any invalid item rejects the batch.
pub async fn bulk_create(db: &DbPool, products: Vec<NewProduct>) -> Result<usize> {
    if products.is_empty() {
        return Err(Error::validation("products", "No products supplied"));
    }

    let valid = products
        .into_iter()
        .enumerate()
        .map(|(index, p)| validate(p, Mode::Bulk { index }))
        .collect::<Result<Vec<_>>>()?;

    let placeholders = valid
        .iter()
        .filter(|p| p.images.len() == 1 && p.images[0] == PLACEHOLDER_IMAGE)
        .count();

    let mut tx = db.begin().await?;
    for product in &valid {
        insert(&mut *tx, product).await?;
    }
    tx.commit().await?;

    tracing::info!(
        inserted = valid.len(),
        placeholder_images = placeholders,
        "Bulk product import committed"
    );
    Ok(valid.len())
}

pub async fn update(db: &DbPool, id: &str, patch: ProductPatch) -> Result<ProductResponse> {
    let current = get(db, id).await?;

    let merged = NewProduct {
        name: patch.name.unwrap_or(current.name),
        brand: current.brand,
        description: patch.description.unwrap_or(current.description),
        highlights: Some(StringList::Many(current.highlights)),
        price: Some(patch.price.unwrap_or(current.price)),
        original_price: patch.original_price.unwrap_or(current.original_price),
        section: current.section,
        category: current.category,
        sub_category: current.sub_category,
        images: Some(patch.images.unwrap_or(StringList::Many(current.images))),
        external_image_urls: None,
        sizes: Some(patch.sizes.unwrap_or(StringList::Many(current.sizes))),
        colors: Some(patch.colors.unwrap_or(StringList::Many(current.colors))),
        stock: patch.stock.unwrap_or(current.stock),
        is_featured: patch.is_featured.unwrap_or(current.is_featured),
    };
    let valid = validate(merged, Mode::Single)?;

    sqlx::query(
        r#"
        UPDATE products SET
            name = ?, description = ?, price = ?, original_price = ?, images = ?,
            sizes = ?, colors = ?, stock = ?, is_featured = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&valid.name)
    .bind(&valid.description)
    .bind(valid.price)
    .bind(valid.original_price)
    .bind(to_json(&valid.images))
    .bind(to_json(&valid.sizes))
    .bind(to_json(&valid.colors))
    .bind(valid.stock)
    .bind(valid.is_featured)
    .bind(now_timestamp())
    .bind(id)
    .execute(db)
    .await?;

    tracing::info!(product_id = %id, "Product updated");
    get(db, id).await
}

pub async fn delete(db: &DbPool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found("Product"));
    }

    tracing::info!(product_id = %id, "Product deleted");
    Ok(())
}
