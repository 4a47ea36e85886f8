//! Password hashing and token issuance.
//!
//! Validation lives in `souk_common::auth` so the gateway can share it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use souk_common::auth::{Claims, ACCESS, REFRESH};
use souk_common::config::AuthConfig;
use souk_common::models::user::User;

/// Token pair returned on register, login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_token(
    user: &User,
    token_type: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
        token_type: token_type.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Issue a fresh access/refresh pair for `user`.
pub fn generate_token_pair(
    user: &User,
    cfg: &AuthConfig,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    Ok(TokenPair {
        access_token: generate_token(user, ACCESS, &cfg.jwt_secret, cfg.access_token_ttl_secs)?,
        refresh_token: generate_token(user, REFRESH, &cfg.jwt_secret, cfg.refresh_token_ttl_secs)?,
        expires_in: cfg.access_token_ttl_secs,
        token_type: "Bearer".to_string(),
    })
}

/// Parse the subject of a validated token.
pub fn subject(claims: &Claims) -> Option<Uuid> {
    claims.sub.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_common::auth::validate_token;
    use souk_common::models::user::{UserRole, UserStatus};

    fn user() -> User {
        User {
            id: Uuid::now_v7(),
            email: "ngozi@example.com".into(),
            phone: None,
            first_name: "Ngozi".into(),
            last_name: "Eze".into(),
            password_hash: String::new(),
            role: UserRole::Agent,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn cfg() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret".into(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 86400,
        }
    }

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn token_pair_carries_role_and_type() {
        let user = user();
        let cfg = cfg();
        let pair = generate_token_pair(&user, &cfg).unwrap();
        assert_eq!(pair.expires_in, 3600);

        let access = validate_token(&pair.access_token, &cfg.jwt_secret).unwrap();
        assert_eq!(access.token_type, ACCESS);
        assert_eq!(access.role, UserRole::Agent);
        assert_eq!(subject(&access), Some(user.id));

        let refresh = validate_token(&pair.refresh_token, &cfg.jwt_secret).unwrap();
        assert_eq!(refresh.token_type, REFRESH);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let pair = generate_token_pair(&user(), &cfg()).unwrap();
        assert!(validate_token(&pair.access_token, "some-other-secret").is_err());
    }
}
