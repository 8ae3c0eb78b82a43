//! Catalog models and DTOs.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::common::{parse_json, StringList};

/// Image used when a bulk-imported product arrives without any
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/800x1000?text=IMAGE_NOT_PROVIDED_IN_DB";

/// Size assigned to bulk-imported products that list none
pub const DEFAULT_SIZE: &str = "Free Size";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub description: String,
    /// JSON array of strings
    pub highlights: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub section: String,
    pub category: String,
    pub sub_category: String,
    /// JSON array of image references; never empty
    pub images: String,
    /// JSON array of strings
    pub sizes: String,
    /// JSON array of strings
    pub colors: String,
    pub stock: i64,
    pub is_featured: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub section: String,
    pub category: String,
    pub sub_category: String,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: i64,
    pub is_featured: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            highlights: parse_json(&p.highlights),
            images: parse_json(&p.images),
            sizes: parse_json(&p.sizes),
            colors: parse_json(&p.colors),
            id: p.id,
            name: p.name,
            brand: p.brand,
            description: p.description,
            price: p.price,
            original_price: p.original_price,
            section: p.section,
            category: p.category,
            sub_category: p.sub_category,
            stock: p.stock,
            is_featured: p.is_featured,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Product creation payload, for single adds and bulk imports
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    pub highlights: Option<StringList>,
    pub price: Option<f64>,
    #[serde(alias = "originalPrice")]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "subCategory")]
    pub sub_category: String,
    /// Already-uploaded asset references
    pub images: Option<StringList>,
    #[serde(alias = "externalImageUrls")]
    pub external_image_urls: Option<StringList>,
    pub sizes: Option<StringList>,
    pub colors: Option<StringList>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, alias = "isFeatured")]
    pub is_featured: bool,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// Absent leaves it untouched, `null` clears it
    #[serde(default, alias = "originalPrice", deserialize_with = "present")]
    pub original_price: Option<Option<f64>>,
    pub stock: Option<i64>,
    #[serde(alias = "isFeatured")]
    pub is_featured: Option<bool>,
    pub sizes: Option<StringList>,
    pub colors: Option<StringList>,
    pub images: Option<StringList>,
}

/// Tell an explicit `null` apart from a missing field
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub section: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "subCategory")]
    pub sub_category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductResponse>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Bulk import accepts a bare array or `{ "products": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BulkProducts {
    List(Vec<NewProduct>),
    Wrapped { products: Vec<NewProduct> },
}

impl BulkProducts {
    pub fn into_vec(self) -> Vec<NewProduct> {
        match self {
            BulkProducts::List(items) | BulkProducts::Wrapped { products: items } => items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkInsertResponse {
    pub inserted_count: usize,
}
