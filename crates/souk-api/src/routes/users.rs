//! The caller's own account and notification preferences.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Json, Router,
};

use souk_common::error::SoukError;
use souk_common::models::user::{
    NotificationPreferences, UpdatePreferencesRequest, UpdateUserRequest, UserResponse,
};
use souk_common::validation::validate_request;
use souk_db::repository::{preferences, users};

use super::{ok, ApiResult};
use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(get_me).patch(update_me))
        .route(
            "/users/me/notification-preferences",
            get(get_preferences).patch(update_preferences),
        )
        .route_layer(middleware::from_fn(crate::middleware::auth_middleware))
}

/// GET /api/v0/users/me
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<UserResponse> {
    let user = users::find_by_id(&state.db.pool, auth.user_id)
        .await?
        .ok_or_else(|| SoukError::not_found("User"))?;
    ok("Profile", user.into())
}

/// PATCH /api/v0/users/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    validate_request(&body)?;

    let user = users::update_profile(
        &state.db.pool,
        auth.user_id,
        body.first_name.as_deref().map(str::trim),
        body.last_name.as_deref().map(str::trim),
        body.phone.as_deref(),
    )
    .await?;
    tracing::debug!(user_id = %auth.user_id, "Profile updated");
    ok("Profile updated", user.into())
}

/// GET /api/v0/users/me/notification-preferences
async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<NotificationPreferences> {
    let prefs = preferences::get(&state.db.pool, auth.user_id).await?;
    ok("Notification preferences", prefs)
}

/// PATCH /api/v0/users/me/notification-preferences
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<UpdatePreferencesRequest>,
) -> ApiResult<NotificationPreferences> {
    let current = preferences::get(&state.db.pool, auth.user_id).await?;
    let next = NotificationPreferences {
        push_enabled: body.push_enabled.unwrap_or(current.push_enabled),
        email_enabled: body.email_enabled.unwrap_or(current.email_enabled),
    };
    let saved = preferences::upsert(&state.db.pool, auth.user_id, next).await?;
    ok("Notification preferences updated", saved)
}
