//! Authentication routes: register, login, refresh.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use souk_common::auth::{token_error, validate_token, REFRESH};
use souk_common::config;
use souk_common::error::{SoukError, SoukResult};
use souk_common::ids::generate_id;
use souk_common::models::user::{LoginRequest, RegisterRequest, User, UserResponse, UserRole, UserStatus};
use souk_common::validation::validate_request;
use souk_db::repository::{agents, users};

use super::{created, ok, ApiResult, Created};
use crate::{
    auth::{self, TokenPair},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
}

#[derive(Serialize)]
pub struct AuthResponse {
    user: UserResponse,
    #[serde(flatten)]
    tokens: TokenPair,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

fn issue(user: User) -> SoukResult<AuthResponse> {
    let tokens = auth::generate_token_pair(&user, &config::get().auth)
        .map_err(|e| SoukError::Internal(e.into()))?;
    Ok(AuthResponse {
        user: user.into(),
        tokens,
    })
}

/// POST /api/v0/auth/register
///
/// Customers and agents sign themselves up; agents also get an empty
/// profile to drive KYC and availability.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Created<AuthResponse> {
    validate_request(&body)?;

    let role = body.role.unwrap_or(UserRole::Customer);
    if role == UserRole::Admin {
        return Err(SoukError::Validation {
            message: "Admin accounts cannot be self-registered".into(),
        });
    }

    if users::find_by_email(&state.db.pool, &body.email).await?.is_some() {
        return Err(SoukError::AlreadyExists {
            resource: "Email".into(),
        });
    }

    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| SoukError::Internal(anyhow::anyhow!("{e}")))?;

    let mut tx = state.db.pool.begin().await?;
    let user = users::create_user(
        &mut *tx,
        &users::NewUser {
            id: generate_id(),
            email: body.email.trim(),
            phone: body.phone.as_deref(),
            first_name: body.first_name.trim(),
            last_name: body.last_name.trim(),
            password_hash: &password_hash,
            role,
        },
    )
    .await?;
    if role == UserRole::Agent {
        agents::create_profile(&mut *tx, user.id).await?;
    }
    tx.commit().await?;

    tracing::info!(user_id = %user.id, role = %role, "New user registered");

    created("Account created", issue(user)?)
}

/// POST /api/v0/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    validate_request(&body)?;

    let user = users::find_by_email(&state.db.pool, body.email.trim())
        .await?
        .ok_or(SoukError::InvalidCredentials)?;

    let valid = auth::verify_password(&body.password, &user.password_hash)
        .map_err(|e| SoukError::Internal(anyhow::anyhow!("{e}")))?;
    if !valid {
        return Err(SoukError::InvalidCredentials);
    }
    if user.status == UserStatus::Suspended {
        tracing::info!(user_id = %user.id, "Suspended user refused login");
        return Err(SoukError::Forbidden);
    }

    tracing::info!(user_id = %user.id, "User logged in");
    ok("Logged in", issue(user)?)
}

/// POST /api/v0/auth/refresh
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let claims = validate_token(&body.refresh_token, &config::get().auth.jwt_secret)
        .map_err(|e| token_error(&e))?;
    if claims.token_type != REFRESH {
        return Err(SoukError::InvalidToken);
    }

    let user_id = auth::subject(&claims).ok_or(SoukError::InvalidToken)?;
    let user = users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or(SoukError::InvalidToken)?;
    if user.status == UserStatus::Suspended {
        return Err(SoukError::Forbidden);
    }

    ok("Token refreshed", issue(user)?)
}
