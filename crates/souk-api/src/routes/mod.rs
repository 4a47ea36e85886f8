pub mod addresses;
pub mod admin;
pub mod agents;
pub mod auth;
pub mod categories;
pub mod chat;
pub mod health;
pub mod kyc;
pub mod markets;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod shopping_lists;
pub mod support;
pub mod users;

use axum::{body::Bytes, http::StatusCode, Json};
use serde::{de::DeserializeOwned, Serialize};

use souk_common::error::{SoukError, SoukResult};
use souk_common::response::ApiResponse;

/// Handler result carrying the success envelope.
pub type ApiResult<T> = SoukResult<Json<ApiResponse<T>>>;

/// Handler result for endpoints that create something.
pub type Created<T> = SoukResult<(StatusCode, Json<ApiResponse<T>>)>;

pub(crate) fn ok<T: Serialize>(message: &str, data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(message, data)))
}

pub(crate) fn created<T: Serialize>(message: &str, data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message, data))))
}

/// Largest page any list endpoint will return.
pub(crate) fn max_page() -> u32 {
    souk_common::config::get().limits.max_page_size
}

/// Parse a body that may be left out entirely (e.g. an optional reason).
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> SoukResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| SoukError::Validation {
        message: format!("Invalid JSON body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_common::models::order::ReasonRequest;

    #[test]
    fn empty_bodies_default() {
        let parsed: ReasonRequest = optional_body(&Bytes::new()).unwrap();
        assert!(parsed.reason.is_none());

        let parsed: ReasonRequest =
            optional_body(&Bytes::from_static(br#"{"reason":"changed my mind"}"#)).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("changed my mind"));

        assert!(optional_body::<ReasonRequest>(&Bytes::from_static(b"{nope")).is_err());
    }
}
