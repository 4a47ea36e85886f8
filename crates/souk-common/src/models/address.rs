//! Delivery addresses saved by customers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    /// "Home", "Office", …
    pub label: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 32))]
    pub label: String,

    #[validate(length(min = 3, max = 255, message = "Address must be 3-255 characters"))]
    pub address: String,

    #[validate(length(min = 2, max = 64))]
    pub city: String,

    #[validate(length(min = 2, max = 64))]
    pub state: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    pub is_default: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 32))]
    pub label: Option<String>,

    #[validate(length(min = 3, max = 255))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 64))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 64))]
    pub state: Option<String>,
}
