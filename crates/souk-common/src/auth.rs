//! Shared JWT authentication utilities.
//!
//! Claims and token validation live here so both souk-api and souk-gateway
//! can use them. Password hashing and token generation stay in souk-api.

use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::SoukError, models::user::UserRole};

/// Token type carried in access tokens.
pub const ACCESS: &str = "access";
/// Token type carried in refresh tokens.
pub const REFRESH: &str = "refresh";

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as string)
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token type ("access" or "refresh")
    pub token_type: String,
}

/// Validate and decode a JWT token.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Map a JWT decoding failure onto the API error it should surface as.
pub fn token_error(err: &jsonwebtoken::errors::Error) -> SoukError {
    match err.kind() {
        ErrorKind::ExpiredSignature => SoukError::TokenExpired,
        _ => SoukError::InvalidToken,
    }
}
