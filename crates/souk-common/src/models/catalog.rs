//! Product catalog: categories and the products markets sell.
//!
//! Prices are integer kobo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 64, message = "Category name must be 2-64 characters"))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 64))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub market_id: Uuid,
    pub vendor_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    /// Selling unit, e.g. "kg", "basket", "piece"
    pub unit: Option<String>,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    pub market_id: Uuid,

    pub category_id: Option<Uuid>,

    #[validate(length(min = 2, max = 120, message = "Product name must be 2-120 characters"))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Price must be 0 to 10 billion naira"))]
    pub price: i64,

    #[validate(length(max = 32))]
    pub unit: Option<String>,

    #[validate(url(message = "Image must be a URL"))]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(range(min = 0i64, max = 1_000_000_000_000i64, message = "Price must be 0 to 10 billion naira"))]
    pub price: Option<i64>,

    #[validate(length(max = 32))]
    pub unit: Option<String>,

    pub is_available: Option<bool>,

    #[validate(url(message = "Image must be a URL"))]
    pub image_url: Option<String>,
}

/// Filters for `GET /products`.
#[derive(Debug, Deserialize, Default)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub market_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}
