//! Markets: physical places agents shop in on a customer's behalf.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

text_enum! {
    pub enum MarketType {
        LocalMarket => "local_market",
        Supermarket => "supermarket",
        Mall => "mall",
        Specialty => "specialty",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub market_type: MarketType,
    /// Free-form, e.g. "Mon-Sat 7am-7pm"
    pub operating_hours: Option<String>,
    pub owner_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMarketRequest {
    #[validate(length(min = 2, max = 120, message = "Market name must be 2-120 characters"))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(length(min = 3, max = 255, message = "Address must be 3-255 characters"))]
    pub address: String,

    #[validate(length(min = 2, max = 64))]
    pub city: String,

    #[validate(length(min = 2, max = 64))]
    pub state: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,

    pub market_type: Option<MarketType>,

    #[validate(length(max = 120))]
    pub operating_hours: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMarketRequest {
    #[validate(length(min = 2, max = 120))]
    pub name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(length(min = 3, max = 255))]
    pub address: Option<String>,

    #[validate(length(min = 2, max = 64))]
    pub city: Option<String>,

    #[validate(length(min = 2, max = 64))]
    pub state: Option<String>,

    pub market_type: Option<MarketType>,

    #[validate(length(max = 120))]
    pub operating_hours: Option<String>,

    pub is_active: Option<bool>,
}

/// Filters for `GET /markets`.
#[derive(Debug, Deserialize, Default)]
pub struct MarketQuery {
    pub q: Option<String>,
    pub city: Option<String>,
    pub market_type: Option<MarketType>,
}
