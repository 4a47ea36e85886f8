//! Middleware: bearer authentication, role checks and security headers.

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use uuid::Uuid;

use souk_common::auth::{self, ACCESS};
use souk_common::error::SoukError;
use souk_common::models::user::UserRole;

/// Who is calling, taken from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), SoukError> {
        self.require_role(&[UserRole::Admin])
    }

    /// Fail with `Forbidden` unless the caller has one of `roles`.
    pub fn require_role(&self, roles: &[UserRole]) -> Result<(), SoukError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(SoukError::Forbidden)
        }
    }
}

/// Extract and validate the JWT from the `Authorization: Bearer <token>` header.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, SoukError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(SoukError::Unauthorized)?;

    let config = souk_common::config::get();
    let claims =
        auth::validate_token(token, &config.auth.jwt_secret).map_err(|e| auth::token_error(&e))?;

    // Refresh tokens are only good for /auth/refresh
    if claims.token_type != ACCESS {
        return Err(SoukError::InvalidToken);
    }

    let user_id = crate::auth::subject(&claims).ok_or(SoukError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

// ── Security headers ──────────────────────────────────────────────────────────

/// Add security headers to every HTTP response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let h = response.headers_mut();

    macro_rules! set {
        ($name:expr, $val:expr) => {
            if let Ok(v) = $val.parse::<axum::http::HeaderValue>() {
                h.insert(axum::http::header::HeaderName::from_static($name), v);
            }
        };
    }

    set!("x-content-type-options", "nosniff");
    set!("x-frame-options", "DENY");
    set!("referrer-policy", "no-referrer");
    set!(
        "strict-transport-security",
        "max-age=63072000; includeSubDomains"
    );
    set!("content-security-policy", "default-src 'none'; frame-ancestors 'none'");

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::now_v7(),
            email: "x@example.com".into(),
            role,
        }
    }

    #[test]
    fn role_checks() {
        assert!(ctx(UserRole::Admin).require_admin().is_ok());
        assert!(matches!(
            ctx(UserRole::Agent).require_admin(),
            Err(SoukError::Forbidden)
        ));
        assert!(ctx(UserRole::Agent)
            .require_role(&[UserRole::Agent, UserRole::Admin])
            .is_ok());
        assert!(ctx(UserRole::Customer)
            .require_role(&[UserRole::Agent])
            .is_err());
    }
}
